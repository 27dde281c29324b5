//! Puzzle solving pipeline: load, render, caption, prompt, parse, record

use crate::arc::{parse_grid_reply, render_task, ArcTask, Dataset, Grid};
use crate::llm::LanguageModel;
use crate::vision::Captioner;
use anyhow::{Context, Result};
use arc_trainer_kg::{AttemptRecord, GraphError, Job, JobStatus, KnowledgeStore};
use serde::Serialize;
use std::sync::Arc;

/// Everything one attempt produced
#[derive(Debug, Clone, Serialize)]
pub struct AttemptOutcome {
    pub task_name: String,
    pub prompt: String,
    pub llm_text: String,
    pub proposed: Option<Grid>,
    pub expected: Option<Grid>,
    pub success: bool,
    pub caption: Option<String>,
}

/// A processed job and the attempt it ran, if it named a puzzle
#[derive(Debug, Clone, Serialize)]
pub struct JobRun {
    pub job_id: String,
    pub status: JobStatus,
    pub outcome: Option<AttemptOutcome>,
}

pub struct PuzzleSolver {
    dataset: Dataset,
    llm: Arc<dyn LanguageModel>,
    captioner: Option<Arc<dyn Captioner>>,
    store: Arc<dyn KnowledgeStore>,
    default_split: String,
}

impl PuzzleSolver {
    pub fn new(
        dataset: Dataset,
        llm: Arc<dyn LanguageModel>,
        store: Arc<dyn KnowledgeStore>,
    ) -> Self {
        Self {
            dataset,
            llm,
            captioner: None,
            store,
            default_split: "evaluation".to_string(),
        }
    }

    pub fn with_captioner(mut self, captioner: Arc<dyn Captioner>) -> Self {
        self.captioner = Some(captioner);
        self
    }

    /// Split used by jobs that do not name one
    pub fn with_default_split(mut self, split: impl Into<String>) -> Self {
        self.default_split = split.into();
        self
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Build the solving prompt from training pairs and the first test input
    pub fn build_prompt(task: &ArcTask, caption: Option<&str>) -> String {
        let mut prompt = String::from(
            "Solve this ARC puzzle. Each training example maps an input grid to an output grid \
             by the same transformation.\n\nTraining examples:\n",
        );
        for (i, example) in task.train.iter().enumerate() {
            prompt.push_str(&format!("Example {} input: {}\n", i + 1, example.input.to_json()));
            if let Some(output) = &example.output {
                prompt.push_str(&format!("Example {} output: {}\n", i + 1, output.to_json()));
            }
        }
        if let Some(caption) = caption {
            prompt.push_str(&format!("\nImage description of the test input: {}\n", caption));
        }
        if let Some(test) = task.first_test() {
            prompt.push_str(&format!("\nTest input: {}\n", test.input.to_json()));
        }
        prompt.push_str(
            "\nAnswer with the test output grid as a JSON array of arrays of integers 0-9.",
        );
        prompt
    }

    /// Render and caption the test input; failures only cost the caption
    async fn caption_for(&self, name: &str, task: &ArcTask) -> Option<String> {
        let captioner = self.captioner.as_ref()?;
        let png = match render_task(task) {
            Ok(png) => png,
            Err(e) => {
                tracing::warn!("Rendering {} failed, continuing without caption: {}", name, e);
                return None;
            }
        };
        match captioner.caption(&png, &format!("{}.png", name)).await {
            Ok(caption) => Some(caption),
            Err(e) => {
                tracing::warn!("Captioning {} failed, continuing without caption: {}", name, e);
                None
            }
        }
    }

    pub async fn attempt(&self, split: &str, name: &str) -> Result<AttemptOutcome> {
        let task = self
            .dataset
            .load(split, name)
            .with_context(|| format!("Failed to load task {}/{}", split, name))?;
        if task.first_test().is_none() {
            anyhow::bail!("Task {} has no test input", name);
        }

        let caption = self.caption_for(name, &task).await;
        let prompt = Self::build_prompt(&task, caption.as_deref());
        let llm_text = self
            .llm
            .ask(&prompt)
            .await
            .with_context(|| format!("LLM query failed for task {}", name))?;

        let proposed = parse_grid_reply(&llm_text);
        let expected = task.expected_output().cloned();
        let success = matches!((&proposed, &expected), (Some(p), Some(e)) if p == e);

        let record = AttemptRecord::new(
            name,
            prompt.as_str(),
            llm_text.as_str(),
            proposed.as_ref().map(Grid::to_json),
            success,
        );
        self.store
            .record_attempt(&record)
            .await
            .context("Failed to record attempt")?;

        let summary = match (&proposed, success) {
            (_, true) => format!("Attempt on {} solved the puzzle", name),
            (Some(grid), false) => format!(
                "Attempt on {} proposed {} which does not match the expected output",
                name,
                grid.to_json()
            ),
            (None, false) => format!("Attempt on {} found no grid in the reply", name),
        };
        self.store
            .store_debate_message(name, &summary, chrono::Utc::now().timestamp_millis())
            .await
            .context("Failed to store debate message")?;

        tracing::info!("{}", summary);
        Ok(AttemptOutcome {
            task_name: name.to_string(),
            prompt,
            llm_text,
            proposed,
            expected,
            success,
            caption,
        })
    }

    pub async fn submit_job(&self, data: serde_json::Value) -> Result<Job> {
        let job = self.store.submit_job(&data).await.context("Failed to submit job")?;
        tracing::info!("Job {} submitted", job.id);
        Ok(job)
    }

    pub async fn job_status(&self, job_id: &str) -> Result<Job> {
        self.store
            .get_job(job_id)
            .await?
            .ok_or_else(|| GraphError::NotFound { kind: "Job", id: job_id.to_string() }.into())
    }

    /// Run a queued job; a `task_name` in its data triggers an attempt
    pub async fn process_job(&self, job_id: &str) -> Result<JobRun> {
        let job = self.job_status(job_id).await?;
        self.store.update_job_status(job_id, JobStatus::Processing).await?;

        let task_name = job.data.get("task_name").and_then(|v| v.as_str());
        let split = job
            .data
            .get("split")
            .and_then(|v| v.as_str())
            .unwrap_or(&self.default_split);

        let outcome = match task_name {
            Some(name) => match self.attempt(split, name).await {
                Ok(outcome) => Some(outcome),
                Err(e) => {
                    tracing::error!("Job {} failed: {:#}", job_id, e);
                    self.store.update_job_status(job_id, JobStatus::Failed).await?;
                    return Err(e);
                }
            },
            None => None,
        };

        self.store.update_job_status(job_id, JobStatus::Completed).await?;
        tracing::info!("Job {} completed", job_id);
        Ok(JobRun {
            job_id: job_id.to_string(),
            status: JobStatus::Completed,
            outcome,
        })
    }
}
