use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum_macros::{AsRefStr, EnumIter, EnumString};

/// The diagram kinds the prompts know how to ask for
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, EnumIter, EnumString, AsRefStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    #[default]
    Auto,
    Flowchart,
    Mindmap,
    Orgchart,
    Sequence,
    Class,
    Er,
    Gantt,
    Timeline,
    Tree,
    Network,
    Architecture,
    Dataflow,
    State,
    Swimlane,
    Concept,
    Fishbone,
    Swot,
    Pyramid,
    Funnel,
    Venn,
    Matrix,
    Infographic,
}

impl ChartType {
    /// Resolve a chart type sent by a client, falling back to `Auto` for anything unknown
    pub fn from_client(value: Option<&str>) -> Self {
        match value {
            Some(raw) => ChartType::from_str(raw.trim()).unwrap_or_else(|_| {
                tracing::debug!("Unknown chart type {:?}, using auto", raw);
                ChartType::Auto
            }),
            None => ChartType::Auto,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ChartType::Auto => "Auto",
            ChartType::Flowchart => "Flowchart",
            ChartType::Mindmap => "Mind Map",
            ChartType::Orgchart => "Org Chart",
            ChartType::Sequence => "Sequence Diagram",
            ChartType::Class => "UML Class Diagram",
            ChartType::Er => "ER Diagram",
            ChartType::Gantt => "Gantt Chart",
            ChartType::Timeline => "Timeline",
            ChartType::Tree => "Tree Diagram",
            ChartType::Network => "Network Topology",
            ChartType::Architecture => "Architecture Diagram",
            ChartType::Dataflow => "Data Flow Diagram",
            ChartType::State => "State Diagram",
            ChartType::Swimlane => "Swimlane Diagram",
            ChartType::Concept => "Concept Map",
            ChartType::Fishbone => "Fishbone Diagram",
            ChartType::Swot => "SWOT Analysis",
            ChartType::Pyramid => "Pyramid Diagram",
            ChartType::Funnel => "Funnel Diagram",
            ChartType::Venn => "Venn Diagram",
            ChartType::Matrix => "Matrix Diagram",
            ChartType::Infographic => "Infographic",
        }
    }

    pub fn is_auto(&self) -> bool {
        matches!(self, ChartType::Auto)
    }
}
