//! Human-viewable episode report rendered from the trajectory log.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::model::{EpisodeMetadata, TrajectoryEntry};
use trail_types::StepOutcome;

/// Render the episode report as a standalone HTML page.
pub fn render(metadata: &EpisodeMetadata, trajectory: &BTreeMap<u32, TrajectoryEntry>) -> String {
    let status_class = if metadata.success { "ok" } else { "failed" };
    let status_text = if metadata.success {
        "SUCCESS"
    } else {
        "FAILED"
    };
    let runtime = humantime::format_duration(Duration::from_secs(
        metadata.runtime_seconds.max(0.0) as u64,
    ));

    let mut rows = String::new();
    for (index, entry) in trajectory {
        let outcome = match entry.outcome {
            StepOutcome::Success => "success",
            StepOutcome::Failed => "failed",
        };
        let note = if entry.note.is_empty() {
            String::new()
        } else {
            format!(" <span class=\"note\">[{}]</span>", escape(&entry.note))
        };
        let screenshot = entry
            .screenshot_ref
            .as_deref()
            .map(|path| {
                format!(
                    "<a href=\"{0}\"><img src=\"{0}\" alt=\"step {1}\"/></a>",
                    escape(path),
                    index
                )
            })
            .unwrap_or_else(|| "<em>purged</em>".to_string());

        rows.push_str(&format!(
            "<tr class=\"{outcome}\"><td>{index}</td><td>{kind}</td>\
             <td>{description}{note}</td><td>{outcome}</td><td>{screenshot}</td></tr>\n",
            kind = escape(&entry.action.kind),
            description = escape(&entry.action.description),
        ));
    }

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8"/>
<title>{name}</title>
<style>
body {{ font-family: sans-serif; margin: 2em; }}
table {{ border-collapse: collapse; width: 100%; }}
td, th {{ border: 1px solid #ccc; padding: 6px 10px; vertical-align: top; }}
tr.failed td {{ background: #fdecea; }}
img {{ max-width: 320px; }}
.status.ok {{ color: #1a7f37; }}
.status.failed {{ color: #cf222e; }}
.note {{ color: #9a6700; font-size: 0.85em; }}
</style>
</head>
<body>
<h1>{name}</h1>
<p class="status {status_class}"><strong>{status_text}</strong> — {reason}</p>
<ul>
<li>Persona: {persona}</li>
<li>Goal: {goal}</li>
<li>Start URL: <a href="{url}">{url}</a></li>
<li>Steps: {steps} &middot; Runtime: {runtime} &middot; Tokens: {tokens}</li>
</ul>
<table>
<tr><th>#</th><th>Action</th><th>Description</th><th>Outcome</th><th>Screenshot</th></tr>
{rows}</table>
</body>
</html>
"#,
        name = escape(&metadata.episode),
        reason = escape(&metadata.termination_reason),
        persona = escape(&metadata.persona),
        goal = escape(&metadata.goal),
        url = escape(&metadata.start_url),
        steps = metadata.total_steps,
        tokens = metadata.token_usage,
    )
}

fn escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::model::ActionRecord;

    #[test]
    fn report_contains_steps_and_escapes_markup() {
        let metadata = EpisodeMetadata {
            episode: "example_1".to_string(),
            persona: "a <tester>".to_string(),
            goal: "click & create".to_string(),
            start_url: "https://example.com".to_string(),
            success: true,
            total_steps: 1,
            runtime_seconds: 12.5,
            token_usage: 900,
            termination_reason: "completed".to_string(),
            steps: vec!["Click Create".to_string()],
        };
        let mut trajectory = BTreeMap::new();
        trajectory.insert(
            0,
            TrajectoryEntry {
                screenshot_ref: Some("images/screenshot_001.png".to_string()),
                state_ref: None,
                action: ActionRecord {
                    kind: "click".to_string(),
                    target: Some(3),
                    description: "Click <Create>".to_string(),
                },
                outcome: StepOutcome::Success,
                note: String::new(),
                timestamp: Utc::now(),
            },
        );

        let html = render(&metadata, &trajectory);
        assert!(html.contains("example_1"));
        assert!(html.contains("Click &lt;Create&gt;"));
        assert!(html.contains("a &lt;tester&gt;"));
        assert!(html.contains("images/screenshot_001.png"));
        assert!(html.contains("SUCCESS"));
    }

    #[test]
    fn purged_steps_render_placeholder() {
        let metadata = EpisodeMetadata {
            episode: "e".to_string(),
            persona: String::new(),
            goal: String::new(),
            start_url: String::new(),
            success: false,
            total_steps: 1,
            runtime_seconds: 0.0,
            token_usage: 0,
            termination_reason: "failed".to_string(),
            steps: Vec::new(),
        };
        let mut trajectory = BTreeMap::new();
        trajectory.insert(
            0,
            TrajectoryEntry {
                screenshot_ref: None,
                state_ref: None,
                action: ActionRecord {
                    kind: "click".to_string(),
                    target: None,
                    description: "failed step".to_string(),
                },
                outcome: StepOutcome::Failed,
                note: String::new(),
                timestamp: Utc::now(),
            },
        );

        let html = render(&metadata, &trajectory);
        assert!(html.contains("<em>purged</em>"));
        assert!(html.contains("FAILED"));
    }
}
