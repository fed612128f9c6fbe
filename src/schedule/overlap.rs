//! Overlap detection and earliest-wins resolution planning

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::Program;

/// Two adjacent programs whose intervals intersect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overlap {
    pub earlier: Uuid,
    pub later: Uuid,
    pub overlap_ms: i64,
}

/// A single repair step against the program table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Move the later program so it starts when the earlier one ends
    Shift {
        program_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },
    /// Remove a program that is concurrent with, or contained in, an earlier one
    Delete { program_id: Uuid },
}

impl Resolution {
    pub fn program_id(&self) -> Uuid {
        match self {
            Resolution::Shift { program_id, .. } | Resolution::Delete { program_id } => *program_id,
        }
    }
}

fn sorted_by_start(programs: &[Program]) -> Vec<&Program> {
    let mut sorted: Vec<&Program> = programs.iter().collect();
    sorted.sort_by_key(|p| p.start_time);
    sorted
}

/// Adjacent pairs (by start time) where the earlier program runs into the next
pub fn find_overlaps(programs: &[Program]) -> Vec<Overlap> {
    sorted_by_start(programs)
        .windows(2)
        .filter_map(|pair| {
            let (prev, next) = (pair[0], pair[1]);
            let overlap_ms = (prev.end_time() - next.start_time).num_milliseconds();
            (overlap_ms > 0).then(|| Overlap {
                earlier: prev.id,
                later: next.id,
                overlap_ms,
            })
        })
        .collect()
}

/// Plan the repairs that make `programs` overlap-free.
///
/// The earlier program always wins. A later program that starts no later than
/// the kept one, or ends within it, is deleted; any other overlapping program
/// is pushed to the kept program's end, which may in turn push its successors.
pub fn plan_resolutions(programs: &[Program]) -> Vec<Resolution> {
    let mut resolutions = Vec::new();
    let mut kept: Option<(DateTime<Utc>, DateTime<Utc>)> = None;

    for program in sorted_by_start(programs) {
        let Some((kept_start, kept_end)) = kept else {
            kept = Some((program.start_time, program.end_time()));
            continue;
        };

        if kept_end <= program.start_time {
            kept = Some((program.start_time, program.end_time()));
            continue;
        }

        if program.start_time <= kept_start || program.end_time() <= kept_end {
            resolutions.push(Resolution::Delete {
                program_id: program.id,
            });
            continue;
        }

        let shifted_end = kept_end + chrono::Duration::milliseconds(program.duration_ms);
        resolutions.push(Resolution::Shift {
            program_id: program.id,
            from: program.start_time,
            to: kept_end,
        });
        kept = Some((kept_end, shifted_end));
    }

    resolutions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ContentRef;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 20, 0, 0).unwrap()
    }

    fn program(start_min: i64, minutes: i64) -> Program {
        Program {
            id: Uuid::new_v4(),
            channel_id: Uuid::nil(),
            start_time: t0() + Duration::minutes(start_min),
            duration_ms: minutes * 60_000,
            content: ContentRef::Episode(Uuid::new_v4()),
        }
    }

    #[test]
    fn test_contiguous_programs_have_no_overlaps() {
        let programs = vec![program(0, 30), program(30, 30), program(60, 15)];
        assert!(find_overlaps(&programs).is_empty());
        assert!(plan_resolutions(&programs).is_empty());
    }

    #[test]
    fn test_detection_ignores_input_order() {
        let a = program(0, 60);
        let b = program(30, 60);
        let overlaps = find_overlaps(&[b.clone(), a.clone()]);
        assert_eq!(
            overlaps,
            vec![Overlap {
                earlier: a.id,
                later: b.id,
                overlap_ms: 30 * 60_000
            }]
        );
    }

    #[test]
    fn test_partial_overlap_shifts_later_program() {
        let a = program(0, 60);
        let b = program(30, 60);
        assert_eq!(
            plan_resolutions(&[a.clone(), b.clone()]),
            vec![Resolution::Shift {
                program_id: b.id,
                from: b.start_time,
                to: a.end_time(),
            }]
        );
    }

    #[test]
    fn test_contained_program_is_deleted() {
        // B starts five minutes before A ends and finishes within A
        let a = program(0, 60);
        let b = program(55, 5);
        assert_eq!(
            plan_resolutions(&[a, b.clone()]),
            vec![Resolution::Delete { program_id: b.id }]
        );
    }

    #[test]
    fn test_concurrent_program_is_deleted() {
        let a = program(0, 30);
        let b = program(0, 45);
        let resolutions = plan_resolutions(&[a.clone(), b.clone()]);
        assert_eq!(resolutions.len(), 1);
        assert!(matches!(resolutions[0], Resolution::Delete { .. }));
        assert!(resolutions[0].program_id() == a.id || resolutions[0].program_id() == b.id);
    }

    #[test]
    fn test_shift_cascades_to_successors() {
        let a = program(0, 60);
        let b = program(50, 30); // pushed to 60..90
        let c = program(80, 30); // pushed to 90..120
        let d = program(130, 30); // untouched
        let resolutions = plan_resolutions(&[a.clone(), b.clone(), c.clone(), d]);
        assert_eq!(
            resolutions,
            vec![
                Resolution::Shift {
                    program_id: b.id,
                    from: b.start_time,
                    to: t0() + Duration::minutes(60),
                },
                Resolution::Shift {
                    program_id: c.id,
                    from: c.start_time,
                    to: t0() + Duration::minutes(90),
                },
            ]
        );
    }

    #[test]
    fn test_earlier_program_survives_after_deletion() {
        let a = program(0, 120);
        let b = program(10, 20); // contained
        let c = program(100, 60); // overlaps A, shifted to A's end
        let resolutions = plan_resolutions(&[a.clone(), b.clone(), c.clone()]);
        assert_eq!(
            resolutions,
            vec![
                Resolution::Delete { program_id: b.id },
                Resolution::Shift {
                    program_id: c.id,
                    from: c.start_time,
                    to: a.end_time(),
                },
            ]
        );
        assert!(resolutions.iter().all(|r| r.program_id() != a.id));
    }
}
