use redcrew_agents::roster;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A goal handed to the flow runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Goal {
    /// Produce a publishable post for one account.
    GenerateContent {
        /// Owning account.
        account_id: String,
        /// Content category, when the caller pins one.
        category: Option<String>,
        /// What the caller wants the post to cover.
        requirements: String,
    },
    /// Produce a product penetration document.
    BuildProductDocument {
        /// Product name.
        product_name: String,
        /// Brand name, when known up front.
        brand_name: Option<String>,
        /// What the caller wants the document to cover.
        requirements: String,
    },
}

impl Goal {
    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Goal::GenerateContent { .. } => "generate_content",
            Goal::BuildProductDocument { .. } => "build_product_document",
        }
    }
}

/// One delegation in a decomposed goal: exactly one specialist role, a
/// task description, and the steps whose outputs feed its context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelegationStep {
    /// Step id, referenced by dependents.
    pub id: Uuid,
    /// Planner-assigned step name (stable, human-readable).
    pub name: String,
    /// Specialist role the step is delegated to.
    pub role: String,
    /// Natural-language task description.
    pub task: String,
    /// Whether a failure of this step fails the whole flow.
    pub required: bool,
    /// Whether this step's payload becomes the artifact body.
    pub deliverable: bool,
    /// Steps that must complete before this one runs. Steps with no
    /// mutual ordering run in parallel.
    pub depends_on: Vec<Uuid>,
}

impl DelegationStep {
    /// Creates a required, non-deliverable step with no dependencies.
    pub fn new(
        name: impl Into<String>,
        role: impl Into<String>,
        task: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            role: role.into(),
            task: task.into(),
            required: true,
            deliverable: false,
            depends_on: Vec::new(),
        }
    }

    /// Declares dependencies on earlier steps.
    pub fn with_dependencies(mut self, deps: Vec<Uuid>) -> Self {
        self.depends_on = deps;
        self
    }

    /// Marks this step's payload as the artifact body.
    pub fn deliverable(mut self) -> Self {
        self.deliverable = true;
        self
    }

    /// Marks the step as optional: a failure skips it instead of failing
    /// the flow.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Whether every dependency is satisfied.
    pub fn is_ready(&self, satisfied: &[Uuid]) -> bool {
        self.depends_on.iter().all(|dep| satisfied.contains(dep))
    }
}

/// Goal decomposition strategy. The default is a fixed pipeline per flow
/// kind; embedders may plug in dynamic planning instead.
pub trait Planner: Send + Sync {
    /// Decomposes a goal into delegation steps.
    fn plan(&self, goal: &Goal, initial_context: &str) -> Vec<DelegationStep>;
}

/// Fixed pipeline per flow kind.
///
/// Content: market analysis → content creation → compliance review.
/// Product document: product research and market analysis in parallel,
/// then document writing over both outputs.
pub struct PipelinePlanner;

impl Planner for PipelinePlanner {
    fn plan(&self, goal: &Goal, _initial_context: &str) -> Vec<DelegationStep> {
        match goal {
            Goal::GenerateContent {
                category,
                requirements,
                ..
            } => {
                let topic = category.as_deref().unwrap_or("the account's niche");
                let analysis = DelegationStep::new(
                    "market_analysis",
                    roster::CHIEF_MARKET_ANALYST,
                    format!("Analyze trending topics and competitor notes for {topic}. Requirements: {requirements}"),
                );
                let creation = DelegationStep::new(
                    "content_creation",
                    roster::CONTENT_CREATOR,
                    format!("Write a complete post (title on the first line, then body) meeting: {requirements}"),
                )
                .with_dependencies(vec![analysis.id])
                .deliverable();
                let review = DelegationStep::new(
                    "compliance_review",
                    roster::COMPLIANCE_REVIEWER,
                    "Review the generated post for platform policy violations and sensitive words",
                )
                .with_dependencies(vec![creation.id]);
                vec![analysis, creation, review]
            }
            Goal::BuildProductDocument {
                product_name,
                requirements,
                ..
            } => {
                let research = DelegationStep::new(
                    "product_research",
                    roster::PRODUCT_RESEARCHER,
                    format!("Research {product_name}: ingredients, positioning, differentiators. Requirements: {requirements}"),
                );
                let analysis = DelegationStep::new(
                    "market_analysis",
                    roster::CHIEF_MARKET_ANALYST,
                    format!("Analyze the market and audience for {product_name}"),
                );
                let writing = DelegationStep::new(
                    "document_writing",
                    roster::CONTENT_CREATOR,
                    format!("Write the full penetration document for {product_name} from the research and analysis"),
                )
                .with_dependencies(vec![research.id, analysis.id])
                .deliverable();
                vec![research, analysis, writing]
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn content_goal() -> Goal {
        Goal::GenerateContent {
            account_id: "acct123".into(),
            category: Some("skincare".into()),
            requirements: "a review post".into(),
        }
    }

    #[test]
    fn test_content_pipeline_shape() {
        let steps = PipelinePlanner.plan(&content_goal(), "");
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0].role, roster::CHIEF_MARKET_ANALYST);
        assert_eq!(steps[1].role, roster::CONTENT_CREATOR);
        assert_eq!(steps[2].role, roster::COMPLIANCE_REVIEWER);
        // sequential chain
        assert_eq!(steps[1].depends_on, vec![steps[0].id]);
        assert_eq!(steps[2].depends_on, vec![steps[1].id]);
        assert!(steps[1].deliverable);
        assert!(steps.iter().all(|s| s.required));
    }

    #[test]
    fn test_product_pipeline_parallel_head() {
        let goal = Goal::BuildProductDocument {
            product_name: "Hydra Cream".into(),
            brand_name: None,
            requirements: "full penetration doc".into(),
        };
        let steps = PipelinePlanner.plan(&goal, "");
        assert_eq!(steps.len(), 3);
        // research and analysis are independent
        assert!(steps[0].depends_on.is_empty());
        assert!(steps[1].depends_on.is_empty());
        // writing joins both
        assert_eq!(steps[2].depends_on.len(), 2);
        assert!(steps[2].deliverable);
    }

    #[test]
    fn test_step_readiness() {
        let a = DelegationStep::new("a", "r1", "t");
        let b = DelegationStep::new("b", "r2", "t").with_dependencies(vec![a.id]);
        assert!(a.is_ready(&[]));
        assert!(!b.is_ready(&[]));
        assert!(b.is_ready(&[a.id]));
    }

    #[test]
    fn test_every_step_names_one_registered_role() {
        for goal in [
            content_goal(),
            Goal::BuildProductDocument {
                product_name: "X".into(),
                brand_name: None,
                requirements: "r".into(),
            },
        ] {
            for step in PipelinePlanner.plan(&goal, "") {
                assert!(roster::ALL.contains(&step.role.as_str()));
            }
        }
    }
}
