//! `add-cron-trigger`: schedule a workflow with a fixed or spread-out cron
//! expression.
//!
//! Macros such as `@daily` pick their minute, hour and day from a hash of a
//! seed, so rerunning a rule set gives the same schedule while different
//! workflows land on different times.

use crate::editor::{self, NewChild};
use crate::path::PathQuery;
use crate::rewrite::{RewriteError, TwoPhase, TwoPhaseStep};
use crate::rules::RuleError;
use crate::tree::{display_path, Node, Segment};
use serde_json::json;
use tracing::debug;

const ON_QUERY: &str = "$.on";
const DAYS_OF_WEEK: [&str; 7] = ["mon", "tue", "wed", "thu", "fri", "sat", "sun"];
const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Macro {
    Hourly,
    Daily,
    Weekly,
    Weekdays,
    Weekends,
    Monthly,
    Yearly,
}

impl Macro {
    fn parse(text: &str) -> Option<Self> {
        Some(match text {
            "@hourly" => Macro::Hourly,
            "@daily" => Macro::Daily,
            "@weekly" => Macro::Weekly,
            "@weekdays" => Macro::Weekdays,
            "@weekends" => Macro::Weekends,
            "@monthly" => Macro::Monthly,
            "@yearly" => Macro::Yearly,
            _ => return None,
        })
    }

    fn expand(self, seed: &str) -> String {
        let mut draw = Draw(fnv1a(seed.as_bytes()));
        let minute = draw.below(60);
        let hour = draw.below(24);
        match self {
            Macro::Hourly => format!("{minute} * * * *"),
            Macro::Daily => format!("{minute} {hour} * * *"),
            Macro::Weekly => {
                let day = DAYS_OF_WEEK[draw.below(7) as usize];
                format!("{minute} {hour} * * {day}")
            }
            Macro::Weekdays => format!("{minute} {hour} * * 1-5"),
            Macro::Weekends => format!("{minute} {hour} * * sat,sun"),
            Macro::Monthly => format!("{minute} {hour} {} * *", 1 + draw.below(28)),
            Macro::Yearly => {
                let day = 1 + draw.below(28);
                let month = MONTHS[draw.below(12) as usize];
                format!("{minute} {hour} {day} {month} *")
            }
        }
    }
}

/// Successive draws from one hash value.
struct Draw(u64);

impl Draw {
    fn below(&mut self, bound: u64) -> u64 {
        let value = self.0 % bound;
        self.0 /= bound;
        value
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325, |hash, &byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3)
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Schedule {
    Fixed(String),
    Spread(Macro),
}

/// Adds `on.schedule` with one cron entry to workflows that have no schedule.
#[derive(Debug, Clone)]
pub struct AddCronTrigger {
    name: String,
    on: PathQuery,
    schedule: Schedule,
    seed: Option<String>,
}

impl AddCronTrigger {
    fn expression(&self, root: &Node) -> String {
        match &self.schedule {
            Schedule::Fixed(expression) => expression.clone(),
            Schedule::Spread(spread) => {
                let seed = self
                    .seed
                    .as_deref()
                    .or_else(|| root.get_keys(&["name"]).and_then(Node::as_str))
                    .unwrap_or(&self.name);
                spread.expand(seed)
            }
        }
    }
}

impl TwoPhase for AddCronTrigger {
    /// The expression to schedule, when the workflow has no schedule yet.
    type Facts = Option<String>;

    fn name(&self) -> &str {
        &self.name
    }

    fn precondition(&self) -> Option<&PathQuery> {
        Some(&self.on)
    }

    fn collect(&self, root: &Node) -> Option<String> {
        let on = root.get_keys(&["on"])?.as_mapping()?;
        (!on.contains_key("schedule")).then(|| self.expression(root))
    }

    fn should_mutate(&self, facts: &Option<String>) -> bool {
        facts.is_some()
    }

    fn mutate(&self, root: &mut Node, facts: &Option<String>) -> Result<(), RewriteError> {
        let Some(expression) = facts else {
            return Ok(());
        };
        let path = [Segment::Key("on".to_string())];
        let on = root.get_path_mut(&path).ok_or_else(|| RewriteError::Detached {
            path: display_path(&path),
        })?;
        let schedule =
            NewChild::entry("schedule", Node::fragment(&json!([{ "cron": expression }])));
        let dispatch = Segment::Key("workflow_dispatch".to_string());
        // Manual triggers stay last.
        let inserted = if on.child(&dispatch).is_some() {
            editor::insert_before(on, &dispatch, schedule)
        } else {
            editor::append(on, schedule)
        };
        inserted.map_err(|source| RewriteError::Edit {
            path: display_path(&path),
            source,
        })?;
        debug!(step = %self.name, cron = %expression, "added schedule");
        Ok(())
    }
}

/// Schedule workflows with `cron`: five POSIX fields, or one of `@hourly`,
/// `@daily`, `@weekly`, `@weekdays`, `@weekends`, `@monthly` or `@yearly`.
///
/// Macro times derive from `seed`, falling back to the workflow's `name`
/// and then the rule id.
pub fn add_cron_trigger(
    name: &str,
    cron: &str,
    seed: Option<&str>,
) -> Result<TwoPhaseStep<AddCronTrigger>, RuleError> {
    let cron = cron.trim();
    let schedule = match Macro::parse(cron) {
        Some(spread) => Schedule::Spread(spread),
        None if cron.starts_with('@') => {
            return Err(RuleError::invalid(name, format!("unknown cron macro '{cron}'")));
        }
        None if cron.split_whitespace().count() == 5 => {
            Schedule::Fixed(cron.split_whitespace().collect::<Vec<_>>().join(" "))
        }
        None => {
            return Err(RuleError::invalid(
                name,
                format!("cron expression '{cron}' must have five fields"),
            ));
        }
    };
    Ok(TwoPhaseStep(AddCronTrigger {
        name: name.to_string(),
        on: PathQuery::parse(ON_QUERY).map_err(RuleError::query(name))?,
        schedule,
        seed: seed.map(str::to_string),
    }))
}
