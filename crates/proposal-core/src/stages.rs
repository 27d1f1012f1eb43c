//! The four pipeline stages and the briefs they hand to their actors.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ProposalError;
use crate::actors::{Actor, Roster};

/// Company and industry supplied by the caller for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunInputs {
    company: String,
    industry: String,
}

impl RunInputs {
    /// Both fields must contain something other than whitespace.
    pub fn new(company: impl Into<String>, industry: impl Into<String>) -> Result<Self, ProposalError> {
        let company = company.into().trim().to_string();
        let industry = industry.into().trim().to_string();

        match (company.is_empty(), industry.is_empty()) {
            (false, false) => Ok(Self { company, industry }),
            (true, true) => Err(ProposalError::validation(
                "Please enter both company name and industry.",
            )),
            (true, false) => Err(ProposalError::validation("Please enter a company name.")),
            (false, true) => Err(ProposalError::validation("Please enter an industry.")),
        }
    }

    pub fn company(&self) -> &str {
        &self.company
    }

    pub fn industry(&self) -> &str {
        &self.industry
    }
}

/// Stage identity. Declaration order is execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Research,
    UseCases,
    Resources,
    Proposal,
}

impl StageKind {
    pub const ALL: [StageKind; 4] = [
        StageKind::Research,
        StageKind::UseCases,
        StageKind::Resources,
        StageKind::Proposal,
    ];

    pub fn id(self) -> &'static str {
        match self {
            StageKind::Research => "research",
            StageKind::UseCases => "use_cases",
            StageKind::Resources => "resources",
            StageKind::Proposal => "proposal",
        }
    }

    /// 1-based position in the pipeline.
    pub fn position(self) -> usize {
        self as usize + 1
    }

    pub fn predecessor(self) -> Option<StageKind> {
        match self {
            StageKind::Research => None,
            StageKind::UseCases => Some(StageKind::Research),
            StageKind::Resources => Some(StageKind::UseCases),
            StageKind::Proposal => Some(StageKind::Resources),
        }
    }

    pub fn successor(self) -> Option<StageKind> {
        match self {
            StageKind::Research => Some(StageKind::UseCases),
            StageKind::UseCases => Some(StageKind::Resources),
            StageKind::Resources => Some(StageKind::Proposal),
            StageKind::Proposal => None,
        }
    }

    pub fn is_last(self) -> bool {
        self.successor().is_none()
    }

    /// Context key under which the stage's text output is stored.
    pub fn output_key(self) -> String {
        format!("stage.{}.output", self.id())
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// A stage with its brief fully resolved for one run.
#[derive(Debug, Clone)]
pub struct Stage {
    pub kind: StageKind,
    pub instruction: String,
    pub expected_output: String,
    pub actor: Arc<Actor>,
    /// Stages whose outputs are handed over as context. Empty or one entry.
    pub context_from: Vec<StageKind>,
}

impl Stage {
    /// Build the four stages for `inputs`, in execution order.
    pub fn plan(inputs: &RunInputs, roster: &Roster) -> Vec<Stage> {
        StageKind::ALL
            .into_iter()
            .map(|kind| Stage {
                kind,
                instruction: instruction(kind, inputs),
                expected_output: expected_output(kind).to_string(),
                actor: roster.for_stage(kind),
                context_from: kind.predecessor().into_iter().collect(),
            })
            .collect()
    }
}

/// Text produced by one stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageOutput {
    pub stage: StageKind,
    pub role: String,
    pub text: String,
    pub duration_ms: u64,
    pub completed_at: DateTime<Utc>,
}

fn instruction(kind: StageKind, inputs: &RunInputs) -> String {
    let company = inputs.company();
    let industry = inputs.industry();

    match kind {
        StageKind::Research => format!(
            "Conduct detailed market research on the {industry} industry and {company}.\n\
             Use the web search tool to understand the industry's landscape and the segment {company} operates in \
             (e.g., Automotive, Manufacturing, Finance, Retail, Healthcare).\n\
             Identify {company}'s key offerings, strategic focus areas (operations, supply chain, customer experience), \
             and provide its vision and product information.\n\
             Refer to reports and insights on AI and digital transformation from sources such as McKinsey, Deloitte, or Nexocode.\n\
             Search for industry-specific use cases. For example, \"how is the {industry} industry leveraging AI and ML\" \
             or \"AI applications in {industry}\".\n\
             Your analysis should be detailed and supported by references from reliable sources."
        ),
        StageKind::UseCases => format!(
            "Analyze industry trends and standards within the {industry} sector related to AI, ML, and automation, \
             based on the research conducted for {company}.\n\
             Propose at least 8 innovative and practical use cases where {company} can leverage GenAI, LLMs, and ML \
             technologies to improve processes, enhance customer satisfaction, and boost operational efficiency.\n\
             For each use case:\n\
             - Describe the use case and how it addresses a specific business problem or opportunity for {company}.\n\
             - Explain how GenAI, LLMs, or other ML technologies would be applied.\n\
             - Search for current Generative AI trends and technologies and how they can be integrated.\n\
             - Detail the expected outcomes and benefits.\n\
             - Include realistic examples of how it would work in practice.\n\
             - Explain why the proposal improves on the current methodology.\n\
             Your use cases should be innovative, feasible, and provide tangible benefits."
        ),
        StageKind::Resources => "Collect the use cases from the previous step and search for relevant datasets \
             on platforms like Kaggle, HuggingFace, and GitHub.\n\
             Save the resource links you find in a text or markdown file. Ensure these links are clickable.\n\
             Ensure that each provided resource is directly related to the proposed use cases. \
             Include a short description and any usage instructions if available."
            .to_string(),
        StageKind::Proposal => format!(
            "List the top use cases to be delivered to the customer, ensuring they are aligned with the company's \
             goals and operational needs.\n\
             Ensure that every suggested use case is listed with links to its resources.\n\
             Add references to the reports and analysis used to suggest these use cases.\n\
             Prepare a well-structured and compelling proposal, including:\n\
             - A concise introduction that outlines the project's objectives and the overall approach.\n\
             - A summary of the key findings from the market research and {company}'s specific strategic areas.\n\
             - A detailed presentation of the top AI/GenAI use cases, including their descriptions, benefits, and required technologies.\n\
             - Explicit, clickable links to the dataset resources and instructions on their usage.\n\
             - Clear, actionable insights and recommendations, aligned with {company}'s goals and operational needs.\n\
             - Proper citations and references to support the use case proposals and resource links.\n\
             The proposal must be well-written, organized, and persuasive, presenting the information in a manner \
             easily understandable for stakeholders."
        ),
    }
}

fn expected_output(kind: StageKind) -> &'static str {
    match kind {
        StageKind::Research => {
            "A detailed report summarizing the company's industry, key offerings, strategic focuses, and vision \
             with a clear product overview. Include references from sources like McKinsey, Deloitte, and Nexocode."
        }
        StageKind::UseCases => {
            "A detailed list of at least 8 use case proposals in markdown format, each clearly describing the problem, \
             technologies involved, expected outcomes, practical examples, and comparison to the status quo."
        }
        StageKind::Resources => {
            "A single markdown file with clickable resource links for all use cases defined, \
             with descriptions and usage instructions."
        }
        StageKind::Proposal => {
            "A single final, persuasive proposal in markdown format with actionable insights, clear recommendations, \
             and clickable resource links. Include references and a list of top use cases aligned with the company's goals."
        }
    }
}
