use std::{error::Error, io};

use log::warn;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{space::ClickPoint, tracker::ClickTracker};

/// A click request, one JSON object per line.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Request {
    /// Classify the click and tell whether its cluster is new for the page.
    NewClick {
        page_uuid: String,
        coordinates: ClickPoint,
    },
    /// Classify the click only.
    PredictClick {
        page_uuid: String,
        coordinates: ClickPoint,
    },
    Version,
}

pub struct Streamer<In, Out, Err>
where
    In: Iterator<Item = Result<String, Err>>,
    Out: FnMut(String),
{
    requests: In,
    write: Out,
}

impl<In, Out, Err> Streamer<In, Out, Err>
where
    In: Iterator<Item = Result<String, Err>>,
    Out: FnMut(String),
    Err: Error + 'static,
{
    pub fn new(requests: In, write: Out) -> Self {
        Self { requests, write }
    }

    /// Answers every request in turn. Rejected requests get an error response,
    /// only a failure of the input stops the run.
    pub fn run(
        mut streamer: Streamer<In, Out, Err>,
        tracker: &ClickTracker,
    ) -> Result<(), Box<dyn Error>> {
        for input in streamer.requests {
            let line = input?;
            if line.trim().is_empty() {
                continue;
            }
            let response = respond(tracker, &line);
            let output = serde_json::to_string(&response)?;
            (streamer.write)(output);
        }
        Ok(())
    }
}

/// Builds the response to one request line.
fn respond(tracker: &ClickTracker, line: &str) -> Value {
    let request: Request = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(reason) => {
            warn!("rejected request: {}", reason);
            return json!({ "error": format!("malformed request: {}", reason) });
        }
    };
    let result = match request {
        Request::NewClick {
            page_uuid,
            coordinates,
        } => tracker
            .observe(&page_uuid, coordinates)
            .map(|observation| json!(observation)),
        Request::PredictClick {
            page_uuid,
            coordinates,
        } => tracker
            .predict(&page_uuid, coordinates)
            .map(|prediction| json!(prediction)),
        Request::Version => Ok(json!({ "version": env!("CARGO_PKG_VERSION") })),
    };
    result.unwrap_or_else(|reason| {
        warn!("rejected request: {}", reason);
        json!({ "error": reason.to_string() })
    })
}

pub fn stdio() -> (impl Iterator<Item = Result<String, io::Error>>, impl FnMut(String)) {
    let requests = io::stdin().lines();
    let write = |response: String| println!("{}", response);
    (requests, write)
}
