//! Gap detection and single-item fill planning

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{ContentLineupItem, NewProgram, Program};

/// Idle time between two adjacent programs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gap {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub after_program: Uuid,
    pub before_program: Uuid,
}

impl Gap {
    pub fn duration_ms(&self) -> i64 {
        (self.end - self.start).num_milliseconds()
    }
}

/// Outcome of planning fills for a set of gaps
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FillPlan {
    pub programs: Vec<NewProgram>,
    pub unfillable: Vec<Gap>,
}

/// Adjacent pairs (by start time) separated by more than `tolerance_ms`
pub fn find_gaps(programs: &[Program], tolerance_ms: i64) -> Vec<Gap> {
    let mut sorted: Vec<&Program> = programs.iter().collect();
    sorted.sort_by_key(|p| p.start_time);

    sorted
        .windows(2)
        .filter_map(|pair| {
            let (prev, next) = (pair[0], pair[1]);
            let gap = Gap {
                start: prev.end_time(),
                end: next.start_time,
                after_program: prev.id,
                before_program: next.id,
            };
            (gap.duration_ms() > tolerance_ms).then_some(gap)
        })
        .collect()
}

/// For every gap, schedule the first lineup item short enough to fit, starting
/// at the gap's beginning. One item per gap; any remainder is left for the next
/// pass.
pub fn plan_fills(channel_id: Uuid, gaps: &[Gap], lineup: &[ContentLineupItem]) -> FillPlan {
    let mut plan = FillPlan::default();

    for gap in gaps {
        let available = gap.duration_ms();
        match lineup.iter().find(|item| item.duration_ms <= available) {
            Some(item) => plan.programs.push(NewProgram {
                channel_id,
                start_time: gap.start,
                duration_ms: item.duration_ms,
                content: item.content,
            }),
            None => plan.unfillable.push(gap.clone()),
        }
    }

    plan
}
