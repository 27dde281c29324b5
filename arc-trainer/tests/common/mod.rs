//! Test doubles shared by the integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;

use arc_trainer::llm::{LanguageModel, LlmError, Result};
use arc_trainer::vision::{CaptionError, Captioner};
use async_trait::async_trait;

/// Answers from a queue, then repeats the fallback; keeps every prompt
pub struct ScriptedModel {
    replies: Mutex<VecDeque<String>>,
    fallback: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            fallback: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn always(reply: &str) -> Self {
        Self {
            fallback: Some(reply.to_string()),
            ..Self::new(&[])
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn ask(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let next = self.replies.lock().unwrap().pop_front();
        next.or_else(|| self.fallback.clone())
            .ok_or_else(|| LlmError::Network("script exhausted".to_string()))
    }
}

/// Answers by keyword: the first rule whose needle appears in the prompt wins
pub struct KeywordModel {
    rules: Vec<(String, String)>,
    default: String,
}

impl KeywordModel {
    pub fn new(rules: &[(&str, &str)], default: &str) -> Self {
        Self {
            rules: rules
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            default: default.to_string(),
        }
    }
}

#[async_trait]
impl LanguageModel for KeywordModel {
    async fn ask(&self, prompt: &str) -> Result<String> {
        Ok(self
            .rules
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, reply)| reply.clone())
            .unwrap_or_else(|| self.default.clone()))
    }
}

pub struct FailingCaptioner;

#[async_trait]
impl Captioner for FailingCaptioner {
    async fn caption(&self, _image: &[u8], _file_name: &str) -> std::result::Result<String, CaptionError> {
        Err(CaptionError::Network("caption service unreachable".to_string()))
    }
}

pub struct FixedCaptioner(pub &'static str);

#[async_trait]
impl Captioner for FixedCaptioner {
    async fn caption(&self, _image: &[u8], _file_name: &str) -> std::result::Result<String, CaptionError> {
        Ok(self.0.to_string())
    }
}

/// Write `<root>/<split>/<name>.json`
pub fn write_task(root: &Path, split: &str, name: &str, json: &str) {
    let dir = root.join(split);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(format!("{}.json", name)), json).unwrap();
}

/// Swap 0 and 1: training pair plus a test pair with a known answer
pub const INVERT_TASK: &str = r#"{
    "train": [{"input": [[0, 1], [1, 0]], "output": [[1, 0], [0, 1]]}],
    "test": [{"input": [[0, 0], [1, 1]], "output": [[1, 1], [0, 0]]}]
}"#;
