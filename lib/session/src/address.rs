//! The shareable address of a step: `/workflows/<id>?step=<n>`.
//!
//! This is the only way to deep-link into a step. A missing or unreadable
//! `step` parameter means step 1. The id is a single percent-encoded path
//! segment, so ids containing `/`, `?` or spaces survive a round trip.

use flowline_core::WorkflowId;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::{Url, form_urlencoded};

const WORKFLOWS_SEGMENT: &str = "workflows";
const EDITOR_SEGMENT: &str = "editor";
const STEP_PARAM: &str = "step";

/// Relative addresses are resolved against this origin before parsing.
const PARSE_BASE: &str = "http://flowline.localhost/";

/// The query half of a step address, as extracted from a request.
///
/// `step` is kept as text so an unreadable value falls back to step 1
/// rather than rejecting the request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StepQuery {
    pub step: Option<String>,
}

impl StepQuery {
    /// The requested step, or 1 when absent or not a number.
    #[must_use]
    pub fn step(&self) -> usize {
        self.step
            .as_deref()
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or(1)
    }
}

/// A workflow id plus the step being viewed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepAddress {
    pub workflow_id: WorkflowId,
    pub step: usize,
}

impl StepAddress {
    #[must_use]
    pub fn new(workflow_id: WorkflowId, step: usize) -> Self {
        Self { workflow_id, step }
    }

    /// Parses a step URL, relative or absolute, with optional query.
    ///
    /// Returns `None` when the path is not a workflow step page.
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        let url = Url::parse(PARSE_BASE).ok()?.join(input).ok()?;

        let mut segments = url.path_segments()?;
        if segments.next()? != WORKFLOWS_SEGMENT {
            return None;
        }
        let encoded_id = segments.next().filter(|id| !id.is_empty())?;
        // A single trailing slash is tolerated; anything deeper is another page.
        match segments.next() {
            None | Some("") => {}
            Some(_) => return None,
        }
        if segments.next().is_some() {
            return None;
        }
        let id = urlencoding::decode(encoded_id).ok()?;

        let query = StepQuery {
            step: url
                .query_pairs()
                .find(|(key, _)| key == STEP_PARAM)
                .map(|(_, value)| value.into_owned()),
        };
        Some(Self::new(WorkflowId::new(id.into_owned()), query.step()))
    }

    /// The URL of the graph editor for a workflow.
    #[must_use]
    pub fn editor_url(workflow_id: &WorkflowId) -> String {
        format!(
            "/{WORKFLOWS_SEGMENT}/{EDITOR_SEGMENT}/{}",
            urlencoding::encode(workflow_id.as_str())
        )
    }
}

impl fmt::Display for StepAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair(STEP_PARAM, &self.step.to_string())
            .finish();
        write!(
            f,
            "/{WORKFLOWS_SEGMENT}/{}?{query}",
            urlencoding::encode(self.workflow_id.as_str())
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(step: Option<&str>) -> StepQuery {
        StepQuery {
            step: step.map(str::to_string),
        }
    }

    #[test]
    fn formats_as_step_url() {
        let address = StepAddress::new(WorkflowId::new("wf-1"), 3);
        assert_eq!(address.to_string(), "/workflows/wf-1?step=3");
    }

    #[test]
    fn parse_is_inverse_of_display() {
        let address = StepAddress::new(WorkflowId::new("abc123"), 2);
        assert_eq!(StepAddress::parse(&address.to_string()), Some(address));
    }

    #[test]
    fn reserved_characters_in_ids_are_encoded() {
        let address = StepAddress::new(WorkflowId::new("wf?x"), 2);
        assert_eq!(address.to_string(), "/workflows/wf%3Fx?step=2");
        assert_eq!(StepAddress::parse(&address.to_string()), Some(address));

        for id in ["a/b", "hello world", "50%", "wf&step=9"] {
            let address = StepAddress::new(WorkflowId::new(id), 4);
            assert_eq!(
                StepAddress::parse(&address.to_string()),
                Some(address),
                "id {id:?}"
            );
        }
    }

    #[test]
    fn encoded_step_values_are_decoded() {
        assert_eq!(
            StepAddress::parse("/workflows/wf?step=%32"),
            Some(StepAddress::new(WorkflowId::new("wf"), 2))
        );
        assert_eq!(
            StepAddress::parse("http://example.com/workflows/wf/?other=1&step=5"),
            Some(StepAddress::new(WorkflowId::new("wf"), 5))
        );
    }

    #[test]
    fn missing_or_bad_step_means_first() {
        assert_eq!(query(None).step(), 1);
        assert_eq!(query(Some("abc")).step(), 1);
        assert_eq!(query(Some("")).step(), 1);
        assert_eq!(query(Some("4")).step(), 4);
        assert_eq!(
            StepAddress::parse("/workflows/wf?other=2").map(|a| a.step),
            Some(1)
        );
    }

    #[test]
    fn editor_paths_are_not_step_pages() {
        assert_eq!(StepAddress::parse("/workflows/editor/wf-1"), None);
        assert_eq!(StepAddress::parse("/connections"), None);
        assert_eq!(StepAddress::parse("/workflows/"), None);
        assert_eq!(StepAddress::parse("/workflows/wf/extra"), None);
    }

    #[test]
    fn editor_url() {
        assert_eq!(
            StepAddress::editor_url(&WorkflowId::new("wf-9")),
            "/workflows/editor/wf-9"
        );
        assert_eq!(
            StepAddress::editor_url(&WorkflowId::new("a/b")),
            "/workflows/editor/a%2Fb"
        );
    }
}
