//! Planning of contiguous program runs
//!
//! Everything here is CPU-only and free of I/O: the caller decides where a run
//! starts, hands over the lineup, and persists the resulting plan in one go.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::models::{ContentLineupItem, ContentRef, NewProgram, Program};
use crate::utils::time::truncate_to_seconds;

/// Where a full regeneration begins and which rows it must clear first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartSelection {
    /// First instant of the new run
    pub start: DateTime<Utc>,
    /// The on-air program that the run continues from, left untouched
    pub preserved: Option<Uuid>,
    /// Programs starting at (or after, see `clear_inclusive`) this instant are replaced
    pub clear_from: DateTime<Utc>,
    pub clear_inclusive: bool,
}

/// Result of one planning pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationPlan {
    pub programs: Vec<NewProgram>,
    /// The per-run program cap stopped the pass before the window was covered
    pub truncated: bool,
    /// Lineup position the next pass should continue from
    pub next_index: usize,
    /// End of the last planned program (the run start when nothing was planned)
    pub end_time: DateTime<Utc>,
}

/// Lays lineup items end to end across a time window
#[derive(Debug, Clone)]
pub struct ScheduleGenerator {
    max_programs: usize,
}

impl ScheduleGenerator {
    pub fn new(max_programs: usize) -> Self {
        Self { max_programs }
    }

    pub fn max_programs(&self) -> usize {
        self.max_programs
    }

    /// Pick the start of a full regeneration.
    ///
    /// `latest` is the most recent program that started at or before `now`.
    /// When it is still on air the run begins at its end; otherwise the run
    /// begins at `now` truncated to whole seconds, or at the end of `latest`
    /// if that program finished within the current second.
    pub fn select_start(latest: Option<&Program>, now: DateTime<Utc>) -> StartSelection {
        match latest {
            Some(program) if program.is_airing_at(now) => StartSelection {
                start: program.end_time(),
                preserved: Some(program.id),
                clear_from: now,
                clear_inclusive: false,
            },
            _ => {
                let truncated = truncate_to_seconds(now);
                let start = latest.map_or(truncated, |program| truncated.max(program.end_time()));
                StartSelection {
                    start,
                    preserved: None,
                    clear_from: start,
                    clear_inclusive: true,
                }
            }
        }
    }

    /// Cycle through `lineup` from `start_index`, emitting back-to-back programs
    /// while the cursor is before `window_end`.
    ///
    /// The last program may run past `window_end`; no program starts at or
    /// after it. Deterministic for identical inputs.
    pub fn plan(
        &self,
        channel_id: Uuid,
        lineup: &[ContentLineupItem],
        start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        start_index: usize,
    ) -> GenerationPlan {
        let mut programs = Vec::new();
        let mut cursor = start;
        let mut index = start_index;
        let mut truncated = false;

        if lineup.is_empty() {
            return GenerationPlan {
                programs,
                truncated,
                next_index: 0,
                end_time: start,
            };
        }

        while cursor < window_end {
            if programs.len() >= self.max_programs {
                truncated = true;
                break;
            }

            let item = &lineup[index % lineup.len()];
            programs.push(NewProgram {
                channel_id,
                start_time: cursor,
                duration_ms: item.duration_ms,
                content: item.content,
            });
            cursor += Duration::milliseconds(item.duration_ms);
            index += 1;
        }

        GenerationPlan {
            programs,
            truncated,
            next_index: index % lineup.len(),
            end_time: cursor,
        }
    }
}

/// Lineup position following the last aired `content`.
///
/// Content that has since left the lineup restarts the rotation at 0.
pub fn resume_index(lineup: &[ContentLineupItem], content: &ContentRef) -> usize {
    if lineup.is_empty() {
        return 0;
    }
    lineup
        .iter()
        .position(|item| item.content == *content)
        .map(|pos| (pos + 1) % lineup.len())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const MINUTE: i64 = 60_000;

    fn item(minutes: i64, order: i32) -> ContentLineupItem {
        ContentLineupItem {
            content: ContentRef::Episode(Uuid::new_v4()),
            duration_ms: minutes * MINUTE,
            lineup_order: order,
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 18, 0, 0).unwrap()
    }

    #[test]
    fn test_two_item_rotation_over_two_hours() {
        let lineup = vec![item(30, 0), item(45, 1)];
        let channel_id = Uuid::new_v4();
        let plan = ScheduleGenerator::new(10_000).plan(
            channel_id,
            &lineup,
            t0(),
            t0() + Duration::hours(2),
            0,
        );

        let offsets: Vec<i64> = plan
            .programs
            .iter()
            .map(|p| (p.start_time - t0()).num_minutes())
            .collect();
        assert_eq!(offsets, vec![0, 30, 75, 105]);

        let contents: Vec<_> = plan.programs.iter().map(|p| p.content).collect();
        assert_eq!(
            contents,
            vec![
                lineup[0].content,
                lineup[1].content,
                lineup[0].content,
                lineup[1].content
            ]
        );
        assert_eq!(plan.end_time, t0() + Duration::minutes(150));
        assert_eq!(plan.next_index, 0);
        assert!(!plan.truncated);
        assert!(plan.programs.iter().all(|p| p.channel_id == channel_id));
    }

    #[test]
    fn test_programs_are_contiguous() {
        let lineup = vec![item(7, 0), item(13, 1), item(29, 2)];
        let plan = ScheduleGenerator::new(10_000).plan(
            Uuid::new_v4(),
            &lineup,
            t0(),
            t0() + Duration::days(3),
            0,
        );

        for pair in plan.programs.windows(2) {
            assert_eq!(pair[0].end_time(), pair[1].start_time);
        }
        assert!(plan.programs.last().unwrap().start_time < t0() + Duration::days(3));
    }

    #[test]
    fn test_plan_is_deterministic() {
        let lineup = vec![item(22, 0), item(44, 1), item(90, 2)];
        let channel_id = Uuid::new_v4();
        let generator = ScheduleGenerator::new(10_000);
        let end = t0() + Duration::hours(30);

        let first = generator.plan(channel_id, &lineup, t0(), end, 0);
        let second = generator.plan(channel_id, &lineup, t0(), end, 0);
        assert_eq!(first, second);
    }

    #[test]
    fn test_cap_truncates_run() {
        let lineup = vec![item(1, 0)];
        let plan = ScheduleGenerator::new(100).plan(
            Uuid::new_v4(),
            &lineup,
            t0(),
            t0() + Duration::days(1),
            0,
        );
        assert_eq!(plan.programs.len(), 100);
        assert!(plan.truncated);
        assert_eq!(plan.end_time, t0() + Duration::minutes(100));
    }

    #[test]
    fn test_start_index_continues_rotation() {
        let lineup = vec![item(10, 0), item(20, 1), item(30, 2)];
        let plan = ScheduleGenerator::new(10_000).plan(
            Uuid::new_v4(),
            &lineup,
            t0(),
            t0() + Duration::minutes(60),
            2,
        );
        let contents: Vec<_> = plan.programs.iter().map(|p| p.content).collect();
        assert_eq!(
            contents,
            vec![lineup[2].content, lineup[0].content, lineup[1].content]
        );
        assert_eq!(plan.next_index, 2);
    }

    #[test]
    fn test_empty_lineup_or_window_plans_nothing() {
        let generator = ScheduleGenerator::new(10_000);
        let plan = generator.plan(Uuid::new_v4(), &[], t0(), t0() + Duration::hours(1), 0);
        assert!(plan.programs.is_empty());

        let plan = generator.plan(Uuid::new_v4(), &[item(30, 0)], t0(), t0(), 0);
        assert!(plan.programs.is_empty());
        assert_eq!(plan.end_time, t0());
    }

    #[test]
    fn test_select_start_after_airing_program() {
        let now = t0() + Duration::minutes(10);
        let airing = Program {
            id: Uuid::new_v4(),
            channel_id: Uuid::new_v4(),
            start_time: t0(),
            duration_ms: 30 * MINUTE,
            content: ContentRef::Movie(Uuid::new_v4()),
        };

        let selection = ScheduleGenerator::select_start(Some(&airing), now);
        assert_eq!(selection.start, t0() + Duration::minutes(30));
        assert_eq!(selection.preserved, Some(airing.id));
        assert_eq!(selection.clear_from, now);
        assert!(!selection.clear_inclusive);
    }

    #[test]
    fn test_select_start_truncates_now_when_nothing_airs() {
        let now = t0() + Duration::minutes(45) + Duration::milliseconds(1_750);
        let ended = Program {
            id: Uuid::new_v4(),
            channel_id: Uuid::new_v4(),
            start_time: t0(),
            duration_ms: 30 * MINUTE,
            content: ContentRef::Movie(Uuid::new_v4()),
        };

        for latest in [Some(&ended), None] {
            let selection = ScheduleGenerator::select_start(latest, now);
            assert_eq!(selection.start, t0() + Duration::minutes(45) + Duration::seconds(1));
            assert_eq!(selection.preserved, None);
            assert!(selection.clear_inclusive);
        }
    }

    #[test]
    fn test_select_start_does_not_reach_into_just_ended_program() {
        let now = t0() + Duration::minutes(30) + Duration::milliseconds(900);
        let ended = Program {
            id: Uuid::new_v4(),
            channel_id: Uuid::new_v4(),
            start_time: t0() + Duration::milliseconds(400),
            duration_ms: 30 * MINUTE,
            content: ContentRef::Movie(Uuid::new_v4()),
        };
        assert!(!ended.is_airing_at(now));

        let selection = ScheduleGenerator::select_start(Some(&ended), now);
        assert_eq!(selection.start, ended.end_time());
        assert_eq!(selection.clear_from, ended.end_time());
        assert_eq!(selection.preserved, None);
        assert!(selection.clear_inclusive);
    }

    #[test]
    fn test_resume_index_wraps_and_falls_back() {
        let lineup = vec![item(10, 0), item(20, 1), item(30, 2)];
        assert_eq!(resume_index(&lineup, &lineup[0].content), 1);
        assert_eq!(resume_index(&lineup, &lineup[2].content), 0);
        assert_eq!(resume_index(&lineup, &ContentRef::Movie(Uuid::new_v4())), 0);
        assert_eq!(resume_index(&[], &lineup[0].content), 0);
    }
}
