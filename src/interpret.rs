//! Free text to task draft, through an OpenAI-compatible chat endpoint.
//!
//! The service is asked for one bare JSON object. Replies are often wrapped
//! in a Markdown code fence anyway, so the fence is stripped before parsing.
//! Nothing is retried here; callers surface a single generic failure.

use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::InterpreterConfig;
use crate::error::{Error, Result};
use crate::schedule::parse_local_datetime;
use crate::task::{TaskDraft, TaskType};

#[derive(Error, Debug)]
pub enum InterpretError {
    /// The call did not complete: transport error, timeout, non-2xx status.
    #[error("interpreter request failed: {0}")]
    NetworkFailure(String),

    /// The reply was not a usable draft.
    #[error("interpreter returned an unusable reply: {0}")]
    MalformedResponse(String),
}

impl InterpretError {
    pub fn kind(&self) -> &'static str {
        match self {
            InterpretError::NetworkFailure(_) => "network_failure",
            InterpretError::MalformedResponse(_) => "malformed_response",
        }
    }
}

/// A parsed draft plus the reply text it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpretation {
    pub draft: TaskDraft,
    pub raw: String,
}

/// Something that turns one sentence into a draft.
#[allow(async_fn_in_trait)]
pub trait Interpreter {
    async fn interpret(
        &self,
        text: &str,
        now: DateTime<FixedOffset>,
    ) -> std::result::Result<Interpretation, InterpretError>;
}

/// System prompt sent with every request. `now` is the user's local time.
pub fn instruction_prompt(now: DateTime<FixedOffset>) -> String {
    format!(
        r#"You are a scheduling assistant. The user writes one natural-language sentence (usually Japanese). Identify the date and the activity the user actually wrote and return this JSON:

{{
  "datetime": "YYYY-MM-DD HH:mm",
  "content": "...",
  "duration": "HH:mm",
  "type": "...",
  "deadline": "YYYY-MM-DD",
  "remindAt": "YYYY-MM-DD"
}}

Rules:
- Only use information from the user's sentence. Do not replace or add content.
- "datetime" is the date and time mentioned, always the nearest future date, in 24-hour time.
- The current time is {now}.
- If no time is given, use 09:00.
- Map parts of the day to times: morning (朝) 07:00, noon (昼) 12:00, afternoon (午後) 13:00, evening (夜) 18:00.
- If a start and end are given (〜から〜まで), use the start as "datetime" and set "duration" to the difference (for example "01:30").
- Otherwise infer a typical "duration": meetings and consultations 01:00, movies and dates 02:00, meals 01:00, shopping 01:30, a walk or the park 00:30, anything else 01:00.
- "content" keeps the user's meaning as a short plain Japanese phrase (〜に行きたい becomes 〜に行く). Never substitute generic words.
- "type" is exactly one of:
  - "schedule": a specific date and time point or time range.
  - "task": something to finish by a deadline without a specific time point. Put the deadline in "deadline" when stated, otherwise omit it.
  - "reminder": no time and no deadline, just a nudge. If a reminder time is implied (for example "in 3 months"), convert it to a date in "remindAt".
  - "other": anything that fits none of the above.
- Include "deadline" only for "task" and "remindAt" only for "reminder".
- Output the JSON object only. No commentary, comments, or formatting marks."#,
        now = now.format("%Y-%m-%d %H:%M %:z"),
    )
}

/// Remove a surrounding Markdown code fence (with optional language tag).
pub fn strip_code_fence(reply: &str) -> &str {
    let mut text = reply.trim();
    if let Some(rest) = text.strip_prefix("```") {
        let tag_len = rest
            .find(|ch: char| !ch.is_ascii_alphanumeric())
            .unwrap_or(rest.len());
        text = &rest[tag_len..];
    }
    let text = text.trim();
    text.strip_suffix("```").unwrap_or(text).trim()
}

#[derive(Debug, Deserialize)]
struct DraftReply {
    datetime: Option<String>,
    content: Option<String>,
    duration: Option<String>,
    #[serde(rename = "type")]
    task_type: Option<String>,
    deadline: Option<String>,
    #[serde(rename = "remindAt", alias = "remind_at")]
    remind_at: Option<String>,
}

/// Parse the (possibly fenced) reply text into a draft.
pub fn parse_draft_response(reply: &str) -> std::result::Result<TaskDraft, InterpretError> {
    let cleaned = strip_code_fence(reply);
    let parsed: DraftReply = serde_json::from_str(cleaned)
        .map_err(|err| InterpretError::MalformedResponse(format!("not a JSON object: {err}")))?;

    let datetime_raw = required(parsed.datetime, "datetime")?;
    let datetime = parse_local_datetime(&datetime_raw).ok_or_else(|| {
        InterpretError::MalformedResponse(format!("bad datetime '{datetime_raw}'"))
    })?;
    let content = required(parsed.content, "content")?;
    let duration = parsed
        .duration
        .ok_or_else(|| missing("duration"))?
        .trim()
        .to_string();
    let type_raw = required(parsed.task_type, "type")?;
    let task_type = TaskType::parse(&type_raw)
        .ok_or_else(|| InterpretError::MalformedResponse(format!("unknown type '{type_raw}'")))?;

    let mut deadline = optional_date(parsed.deadline, "deadline")?;
    let mut remind_at = optional_date(parsed.remind_at, "remindAt")?;

    if deadline.is_some() && task_type != TaskType::Task {
        tracing::warn!(%task_type, "interpreter set deadline on a non-task draft; dropping it");
        deadline = None;
    }
    if remind_at.is_some() && task_type != TaskType::Reminder {
        tracing::warn!(%task_type, "interpreter set remindAt on a non-reminder draft; dropping it");
        remind_at = None;
    }

    Ok(TaskDraft {
        datetime,
        content,
        duration: Some(duration),
        task_type,
        deadline,
        remind_at,
    })
}

fn missing(field: &str) -> InterpretError {
    InterpretError::MalformedResponse(format!("missing field '{field}'"))
}

fn required(value: Option<String>, field: &str) -> std::result::Result<String, InterpretError> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .ok_or_else(|| missing(field))
}

fn optional_date(
    value: Option<String>,
    field: &str,
) -> std::result::Result<Option<NaiveDate>, InterpretError> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| InterpretError::MalformedResponse(format!("bad {field} '{raw}'"))),
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// HTTP interpreter for chat-completions style endpoints.
#[derive(Clone)]
pub struct HttpInterpreter {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl HttpInterpreter {
    /// Build a client from config. The API key is read from the configured
    /// environment variable; a missing key sends the request unauthenticated.
    pub fn from_config(config: &InterpreterConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty());
        if api_key.is_none() {
            tracing::debug!(env = %config.api_key_env, "no interpreter API key set");
        }
        Self::new(
            &config.endpoint,
            &config.model,
            api_key,
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn new(
        endpoint: &str,
        model: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| Error::InvalidConfig(format!("cannot build HTTP client: {err}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            api_key,
        })
    }

    async fn request_reply(
        &self,
        text: &str,
        now: DateTime<FixedOffset>,
    ) -> std::result::Result<String, InterpretError> {
        let prompt = instruction_prompt(now);
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &prompt,
                },
                ChatMessage {
                    role: "user",
                    content: text,
                },
            ],
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|err| InterpretError::NetworkFailure(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(InterpretError::NetworkFailure(format!(
                "endpoint answered {status}"
            )));
        }
        let payload = response
            .text()
            .await
            .map_err(|err| InterpretError::NetworkFailure(err.to_string()))?;

        let envelope: ChatResponse = serde_json::from_str(&payload).map_err(|err| {
            InterpretError::MalformedResponse(format!("unexpected envelope: {err}"))
        })?;
        envelope
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| InterpretError::MalformedResponse("reply has no content".to_string()))
    }
}

impl Interpreter for HttpInterpreter {
    async fn interpret(
        &self,
        text: &str,
        now: DateTime<FixedOffset>,
    ) -> std::result::Result<Interpretation, InterpretError> {
        let raw = self.request_reply(text, now).await?;
        tracing::debug!(reply_len = raw.len(), "interpreter replied");
        let draft = parse_draft_response(&raw)?;
        Ok(Interpretation { draft, raw })
    }
}
