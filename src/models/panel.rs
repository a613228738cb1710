//! Panels a front end can ask the core to render

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{
    book::Book,
    member::Member,
    report::{CurrentLoan, DashboardStats, IssueForm, OverdueLoan},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Panel {
    Dashboard,
    Books,
    Members,
    Issue,
    Current,
    Overdue,
}

impl std::str::FromStr for Panel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dashboard" => Ok(Panel::Dashboard),
            "books" => Ok(Panel::Books),
            "members" => Ok(Panel::Members),
            "issue" => Ok(Panel::Issue),
            "current" => Ok(Panel::Current),
            "overdue" => Ok(Panel::Overdue),
            _ => Err(format!("Unknown panel: {}", s)),
        }
    }
}

/// Data behind one panel
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(tag = "panel", content = "data", rename_all = "lowercase")]
pub enum PanelView {
    Dashboard(DashboardStats),
    Books(Vec<Book>),
    Members(Vec<Member>),
    Issue(IssueForm),
    Current(Vec<CurrentLoan>),
    Overdue(Vec<OverdueLoan>),
}

impl PanelView {
    pub fn panel(&self) -> Panel {
        match self {
            PanelView::Dashboard(_) => Panel::Dashboard,
            PanelView::Books(_) => Panel::Books,
            PanelView::Members(_) => Panel::Members,
            PanelView::Issue(_) => Panel::Issue,
            PanelView::Current(_) => Panel::Current,
            PanelView::Overdue(_) => Panel::Overdue,
        }
    }
}
