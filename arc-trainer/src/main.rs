use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use arc_trainer::arc::{render_png, Transformation};
use arc_trainer::challenge::{validate_reasoning, ChallengeService};
use arc_trainer::export::{ExportFormat, Exporter};
use arc_trainer::feedback::FeedbackService;
use arc_trainer::llm::{IntentClient, LlmClient};
use arc_trainer::reasoning::{self, propose_rule, CounterexampleFinder, TestCase};
use arc_trainer::vision::{Captioner, GridDescriber, HuggingFaceCaptioner};
use arc_trainer::{dashboard, Dataset, PuzzleSolver, TrainerConfig};
use arc_trainer_kg::{Domain, GraphClient, GraphStore, KnowledgeStore, MemoryStore, SessionFeedback};

#[derive(Parser)]
#[command(name = "arc-trainer")]
#[command(about = "ARC reasoning trainer", long_about = None)]
struct Cli {
    /// JSON file overriding the LLM client settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Use an in-memory store instead of Neo4j
    #[arg(long)]
    dry_run: bool,

    /// Dataset split to read puzzles from
    #[arg(short, long, default_value = "evaluation")]
    split: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the knowledge graph connection
    Health,

    /// Print a puzzle
    Load {
        name: String,
    },

    /// List puzzles in the split
    List,

    /// Apply a transformation (invert, rotate, mirror) to a puzzle's test input
    Transform {
        name: String,
        transformation: Transformation,
    },

    /// Render a puzzle's test input to PNG
    Render {
        name: String,

        /// Output file (defaults to <name>.png)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Ask the LLM to solve a puzzle and record the attempt
    Attempt {
        name: String,
    },

    /// Latest recorded solution for a puzzle
    Solution {
        name: String,
    },

    /// Check whether the attempts on a puzzle disagree
    Contradictions {
        name: String,
    },

    /// Show the debate log
    Debate {
        /// Only this puzzle
        #[arg(long)]
        task: Option<String>,
    },

    /// Queue a job from JSON data
    SubmitJob {
        data: String,
    },

    /// Show a job, optionally running it first
    Job {
        id: String,

        #[arg(long)]
        process: bool,
    },

    /// Leave feedback on an ontology rule
    Feedback {
        #[arg(long)]
        rule: String,

        #[arg(long)]
        user: String,

        #[arg(long, value_parser = parse_domain)]
        domain: Domain,

        text: String,
    },

    /// Refine a rule from its pending feedback
    Refine {
        #[arg(long)]
        rule: String,

        #[arg(long, value_parser = parse_domain)]
        domain: Domain,
    },

    /// Record feedback on a training session
    SessionFeedback {
        session: String,

        comment: String,

        #[arg(long)]
        task: Option<String>,

        #[arg(long)]
        rating: Option<i64>,

        /// Corrected rule fragment
        #[arg(long)]
        correction: Option<String>,
    },

    /// Mark rules validated by the corrections of a puzzle or session
    Integrate {
        #[arg(long, conflicts_with = "session", required_unless_present = "session")]
        task: Option<String>,

        #[arg(long)]
        session: Option<String>,
    },

    /// Generate and screen counterexamples for a rule
    Counterexamples {
        rule: String,
    },

    /// Validate a Prolog-style rule against test cases
    ValidateRule {
        rule: String,

        /// Test case as input=output (repeatable)
        #[arg(long = "case")]
        cases: Vec<TestCase>,
    },

    /// Extract the inferred rule from a JSON reasoning trace
    ProposeRule {
        trace: String,
    },

    /// Export a domain's ontology relationships
    Export {
        #[arg(long, value_parser = parse_domain)]
        domain: Domain,

        /// csv, json, graphml or cypher
        #[arg(long, default_value = "json")]
        format: ExportFormat,
    },

    /// Rule and trust metrics
    Dashboard,

    /// Create a reasoning challenge from an uploaded image
    Challenge {
        image: PathBuf,
    },

    /// Check a rule or free-text answer to a challenge
    Reason {
        text: String,
    },

    /// Detect the intent of a piece of text
    Intent {
        text: String,
    },

    /// Ask with a cause-effect instruction and validate the answer
    Causal {
        prompt: String,

        /// Also ask what would happen if the opposite were true
        #[arg(long)]
        socratic: bool,
    },

    /// Ask every consensus model and record the agreement score
    Consensus {
        prompt: String,
    },
}

fn parse_domain(s: &str) -> std::result::Result<Domain, String> {
    Domain::parse(s).ok_or_else(|| {
        let known: Vec<&str> = Domain::ALL.iter().map(Domain::as_str).collect();
        format!("unknown domain '{}' (expected one of: {})", s, known.join(", "))
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Shared handles for one invocation
struct App {
    config: TrainerConfig,
    split: String,
    graph: Option<Arc<GraphStore>>,
    store: Arc<dyn KnowledgeStore>,
}

impl App {
    async fn new(config: TrainerConfig, split: String, dry_run: bool) -> Result<Self> {
        let (graph, store) = if dry_run {
            tracing::info!("Dry run: using in-memory store");
            let store: Arc<dyn KnowledgeStore> = Arc::new(MemoryStore::new());
            (None, store)
        } else {
            let settings = &config.graph;
            let client = GraphClient::new(
                &settings.uri,
                &settings.user,
                &settings.password,
                &settings.database,
            )
            .await
            .with_context(|| format!("Failed to connect to Neo4j at {}", settings.uri))?;
            let graph = Arc::new(GraphStore::new(client));
            let store: Arc<dyn KnowledgeStore> = graph.clone();
            (Some(graph), store)
        };

        Ok(Self {
            config,
            split,
            graph,
            store,
        })
    }

    fn dataset(&self) -> Dataset {
        Dataset::new(&self.config.dataset_dir)
    }

    fn llm(&self) -> Result<Arc<LlmClient>> {
        Ok(Arc::new(LlmClient::new(&self.config.llm)?))
    }

    fn captioner(&self) -> Result<Arc<dyn Captioner>> {
        match &self.config.captioner {
            Some(settings) => {
                let http = reqwest::Client::builder()
                    .timeout(self.config.llm.timeout)
                    .build()
                    .context("Failed to build HTTP client for captioning")?;
                Ok(Arc::new(HuggingFaceCaptioner::new(
                    http,
                    settings.endpoint.clone(),
                    settings.bearer_token.clone(),
                )))
            }
            None => Ok(Arc::new(GridDescriber)),
        }
    }

    fn solver(&self) -> Result<PuzzleSolver> {
        Ok(PuzzleSolver::new(self.dataset(), self.llm()?, self.store.clone())
            .with_captioner(self.captioner()?)
            .with_default_split(self.split.clone()))
    }

    fn feedback(&self) -> Result<FeedbackService> {
        Ok(FeedbackService::new(self.llm()?, self.store.clone()))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = TrainerConfig::from_env()?;
    if let Some(path) = &cli.config {
        config.apply_file(path)?;
    }

    // Initialize logging
    let default_filter = format!(
        "arc_trainer={level},arc_trainer_kg={level}",
        level = config.log_level
    );
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or(default_filter),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    config.log_summary();

    let app = App::new(config, cli.split.clone(), cli.dry_run).await?;

    match cli.command {
        Commands::Health => match &app.graph {
            Some(graph) => {
                let result = graph.client().health_check_with_retry().await;
                print_json(&result)?;
                if !result.status.is_operational() {
                    anyhow::bail!("Knowledge graph is unhealthy");
                }
            }
            None => print_json(&json!({ "store": "memory", "status": "healthy" }))?,
        },

        Commands::Load { ref name } => {
            let task = app.dataset().load(&app.split, name)?;
            print_json(&task)?;
        }

        Commands::List => {
            let names = app.dataset().list(&app.split)?;
            print_json(&names)?;
        }

        Commands::Transform { ref name, transformation } => {
            let task = app.dataset().load(&app.split, name)?;
            let test = task
                .first_test()
                .with_context(|| format!("Task {} has no test input", name))?;
            print_json(&json!({
                "input": test.input,
                "output": test.input.transform(transformation),
            }))?;
        }

        Commands::Render { ref name, ref out } => {
            let task = app.dataset().load(&app.split, name)?;
            let test = task
                .first_test()
                .with_context(|| format!("Task {} has no test input", name))?;
            let png = render_png(&test.input)?;
            let path = out.clone().unwrap_or_else(|| PathBuf::from(format!("{}.png", name)));
            std::fs::write(&path, &png)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            print_json(&json!({ "path": path, "bytes": png.len() }))?;
        }

        Commands::Attempt { ref name } => {
            let outcome = app.solver()?.attempt(&app.split, name).await?;
            print_json(&outcome)?;
        }

        Commands::Solution { ref name } => {
            let solution = app.store.query_solution(name).await?;
            print_json(&json!({ "task_name": name, "solution": solution }))?;
        }

        Commands::Contradictions { ref name } => {
            let report = app.store.detect_contradictions(name).await?;
            print_json(&report)?;
        }

        Commands::Debate { ref task } => {
            let history = app.store.fetch_debate_history(task.as_deref()).await?;
            print_json(&history)?;
        }

        Commands::SubmitJob { ref data } => {
            let data: serde_json::Value =
                serde_json::from_str(data).context("Job data must be JSON")?;
            let job = app.solver()?.submit_job(data).await?;
            print_json(&job)?;
        }

        Commands::Job { ref id, process } => {
            let solver = app.solver()?;
            if process {
                print_json(&solver.process_job(id).await?)?;
            } else {
                print_json(&solver.job_status(id).await?)?;
            }
        }

        Commands::Feedback { ref rule, ref user, domain, ref text } => {
            let feedback = app.feedback()?.store_feedback(rule, text, user, domain).await?;
            print_json(&feedback)?;
        }

        Commands::Refine { ref rule, domain } => {
            let refinement = app.feedback()?.refine_rule(rule, domain).await?;
            print_json(&refinement)?;
        }

        Commands::SessionFeedback { ref session, ref comment, ref task, rating, ref correction } => {
            let mut feedback = SessionFeedback::new(comment.as_str());
            if let Some(task) = task {
                feedback = feedback.for_task(task.as_str());
            }
            if let Some(rating) = rating {
                feedback = feedback.with_rating(rating);
            }
            if let Some(correction) = correction {
                feedback = feedback.with_correction(correction.as_str());
            }
            app.feedback()?.submit_session_feedback(session, &feedback).await?;
            print_json(&feedback)?;
        }

        Commands::Integrate { ref task, ref session } => {
            let service = app.feedback()?;
            let validated = match (task, session) {
                (Some(task), _) => service.integrate_corrections(task).await?,
                (None, Some(session)) => service.update_from_session(session).await?,
                (None, None) => 0,
            };
            print_json(&json!({ "rules_validated": validated }))?;
        }

        Commands::Counterexamples { ref rule } => {
            let finder = CounterexampleFinder::new(app.llm()?, app.store.clone());
            print_json(&finder.find(rule).await?)?;
        }

        Commands::ValidateRule { ref rule, ref cases } => {
            let report = reasoning::validate_and_record(app.store.as_ref(), rule, cases).await?;
            print_json(&report)?;
        }

        Commands::ProposeRule { ref trace } => {
            let trace: serde_json::Value =
                serde_json::from_str(trace).context("Reasoning trace must be JSON")?;
            print_json(&json!({ "rule": propose_rule(&trace)? }))?;
        }

        Commands::Export { domain, format } => {
            let exporter = Exporter::new(app.store.clone(), &app.config.export_dir);
            let path = exporter.export(domain, format).await?;
            print_json(&json!({ "domain": domain, "format": format.to_string(), "path": path }))?;
        }

        Commands::Dashboard => {
            let report = dashboard::build(app.store.as_ref()).await?;
            println!("{}", dashboard::to_json(&report)?);
        }

        Commands::Challenge { ref image } => {
            let service =
                ChallengeService::new(app.captioner()?, app.store.clone(), &app.config.upload_dir);
            print_json(&service.from_image(image).await?)?;
        }

        Commands::Reason { ref text } => {
            print_json(&validate_reasoning(text)?)?;
        }

        Commands::Intent { ref text } => {
            let llm = &app.config.llm;
            let key = Some(llm.api_key.clone());
            let client = IntentClient::new(app.config.intent_url.clone(), key, llm.timeout)?;
            print_json(&client.analyze(text).await?)?;
        }

        Commands::Causal { ref prompt, socratic } => {
            let llm = app.llm()?;
            let answer = if socratic {
                llm.socratic(prompt).await?
            } else {
                llm.query_causal(prompt).await?
            };
            print_json(&answer)?;
        }

        Commands::Consensus { ref prompt } => {
            let consensus = app.llm()?.consensus(prompt).await?;
            app.store
                .log_ai_trust_verification(prompt, consensus.score())
                .await
                .context("Failed to record trust score")?;
            print_json(&consensus)?;
        }
    }

    Ok(())
}
