//! Role definitions for the four actors taking part in a run.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::ProposalError;
use crate::runtime::{ActorRuntime, StageRequest};
use crate::stages::StageKind;
use crate::tools::BoundTool;

/// The fixed set of roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    MarketResearchAnalyst,
    SolutionsArchitect,
    ResourceCurator,
    ProposalWriter,
}

impl ActorRole {
    pub fn title(self) -> &'static str {
        match self {
            ActorRole::MarketResearchAnalyst => "Market Research Analyst",
            ActorRole::SolutionsArchitect => "AI and GenAI Solutions Architect",
            ActorRole::ResourceCurator => "Data and Resource Curator",
            ActorRole::ProposalWriter => "Proposal Writer",
        }
    }

    pub fn goal(self) -> &'static str {
        match self {
            ActorRole::MarketResearchAnalyst => {
                "Conduct comprehensive market research on the given company and industry, identifying key trends, \
                 challenges, and strategic focuses. Generate a thorough understanding of the company and its sector. \
                 Provide detailed insights."
            }
            ActorRole::SolutionsArchitect => {
                "Analyze industry trends and company-specific information to propose innovative and practical AI and \
                 GenAI use cases, focusing on enhancing operational efficiency and customer experiences. Prioritize \
                 GenAI solutions that can significantly improve current processes."
            }
            ActorRole::ResourceCurator => {
                "Gather relevant datasets and resource links for proposed AI/GenAI use cases. Ensure the resources are \
                 reliable, up-to-date, and suitable for practical implementation. Use platforms like Kaggle, \
                 HuggingFace, and GitHub for datasets."
            }
            ActorRole::ProposalWriter => {
                "Craft a well-structured, comprehensive, and compelling proposal that effectively communicates the top \
                 AI/GenAI use cases, their benefits, and actionable recommendations, ensuring it is persuasive and easy \
                 to understand. Ensure the proposal includes references and clickable resource links."
            }
        }
    }

    pub fn backstory(self) -> &'static str {
        match self {
            ActorRole::MarketResearchAnalyst => {
                "A meticulous market research analyst with a background in data analysis and industry trends. Known for \
                 gathering information from diverse sources and providing strategic insights. Focuses on delivering \
                 actionable research that informs strategic decisions."
            }
            ActorRole::SolutionsArchitect => {
                "A highly skilled AI/ML engineer with expertise in machine learning, generative AI, and automation. \
                 Known for creating effective solutions from business needs and proposing use cases that drive value \
                 and improve efficiency."
            }
            ActorRole::ResourceCurator => {
                "A detail-oriented data curator with expertise in data management and resource organization. \
                 Specializes in identifying relevant datasets and maintaining an accurate and useful resource library. \
                 Ensures resources are of high quality and easy to access."
            }
            ActorRole::ProposalWriter => {
                "An experienced proposal writer with a history of creating persuasive and high-impact business \
                 proposals. Expert at synthesizing complex information into clear, concise proposals that convince \
                 stakeholders."
            }
        }
    }
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Capability flags handed through to the model runtime untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub memory: bool,
    pub allow_delegation: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            memory: true,
            allow_delegation: true,
        }
    }
}

/// A role bound to a model runtime and a set of tools.
pub struct Actor {
    role: ActorRole,
    runtime: Arc<dyn ActorRuntime>,
    tools: Vec<BoundTool>,
    capabilities: Capabilities,
}

impl Actor {
    pub fn new(role: ActorRole, runtime: Arc<dyn ActorRuntime>, tools: Vec<BoundTool>) -> Self {
        Self {
            role,
            runtime,
            tools,
            capabilities: Capabilities::default(),
        }
    }

    pub fn role(&self) -> ActorRole {
        self.role
    }

    pub fn goal(&self) -> &'static str {
        self.role.goal()
    }

    pub fn backstory(&self) -> &'static str {
        self.role.backstory()
    }

    pub fn tools(&self) -> &[BoundTool] {
        &self.tools
    }

    pub fn tool_names(&self) -> Vec<&'static str> {
        self.tools.iter().map(BoundTool::name).collect()
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Drain the first failure any bound tool recorded.
    pub fn take_tool_failure(&self) -> Option<String> {
        let failures: Vec<String> = self.tools.iter().filter_map(BoundTool::take_failure).collect();
        failures.into_iter().next()
    }

    /// Carry out one stage as this role.
    pub async fn perform(&self, request: &StageRequest) -> Result<String, ProposalError> {
        debug!(
            role = %self.role,
            stage = %request.stage,
            tools = ?self.tool_names(),
            "actor performing stage"
        );

        let result = self.runtime.invoke(self, request).await;

        // A latched tool failure wins over whatever the model produced afterwards.
        if let Some(failure) = self.take_tool_failure() {
            return Err(ProposalError::ToolFailed(failure));
        }

        result
    }
}

impl fmt::Debug for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Actor")
            .field("role", &self.role)
            .field("tools", &self.tools)
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

/// Tools created fresh for one run.
#[derive(Clone)]
pub struct RunTools {
    pub search: crate::tools::WebSearchTool,
    pub file_sink: crate::tools::SaveToFileTool,
}

/// The four actors for a run.
#[derive(Debug, Clone)]
pub struct Roster {
    pub analyst: Arc<Actor>,
    pub architect: Arc<Actor>,
    pub curator: Arc<Actor>,
    pub writer: Arc<Actor>,
}

impl Roster {
    pub fn assemble(runtime: Arc<dyn ActorRuntime>, tools: &RunTools) -> Self {
        let search = || BoundTool::Search(tools.search.clone());
        let file_sink = || BoundTool::FileSink(tools.file_sink.clone());

        Self {
            analyst: Arc::new(Actor::new(
                ActorRole::MarketResearchAnalyst,
                runtime.clone(),
                vec![search()],
            )),
            architect: Arc::new(Actor::new(
                ActorRole::SolutionsArchitect,
                runtime.clone(),
                vec![search()],
            )),
            curator: Arc::new(Actor::new(
                ActorRole::ResourceCurator,
                runtime.clone(),
                vec![search(), file_sink()],
            )),
            writer: Arc::new(Actor::new(
                ActorRole::ProposalWriter,
                runtime,
                vec![file_sink()],
            )),
        }
    }

    pub fn for_stage(&self, stage: StageKind) -> Arc<Actor> {
        match stage {
            StageKind::Research => self.analyst.clone(),
            StageKind::UseCases => self.architect.clone(),
            StageKind::Resources => self.curator.clone(),
            StageKind::Proposal => self.writer.clone(),
        }
    }
}
