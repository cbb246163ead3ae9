pub mod corpus;
pub mod goal;
pub mod kanban;
pub mod mastery;
pub mod plan;
pub mod record;
pub mod streak;

use chrono::{SecondsFormat, Utc};

pub(crate) fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
