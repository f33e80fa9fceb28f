//! The lessons-learned post-hook.
//!
//! When a session carries a verification failure (a stale write that was
//! caught by the optimistic lock), append a short Markdown block to the
//! shared knowledge file so every future session selecting the intent
//! sees it. Idempotent when there is nothing to report.

use async_trait::async_trait;
use ward_hooks::HookFailure;
use ward_hooks::PostHook;
use ward_hooks::PostOutcome;
use ward_protocol::ToolCall;
use ward_protocol::ToolResult;

use crate::session::Session;

/// Fixed lesson text appended under each failure block.
const LESSON_TEXT: &str = "Lesson: re-read a file immediately before editing it; \
the workspace can change between the read and the write.";

pub struct LessonsLearnedHook;

#[async_trait]
impl PostHook<Session> for LessonsLearnedHook {
    fn name(&self) -> &str {
        "lessons_learned"
    }

    async fn run(
        &self,
        session: &Session,
        _call: &ToolCall,
        _result: &ToolResult,
    ) -> Result<PostOutcome, HookFailure> {
        let failure = session.state.lock().await.take_verification_failure();
        let Some(failure) = failure else {
            return Ok(PostOutcome::ok());
        };

        let block = format!(
            "\n## Verification failure ({timestamp})\n\n\
             - Tool: `{tool}`\n\
             - Path: `{path}`\n\
             - Expected: `{expected}`\n\
             - Actual: `{actual}`\n\n\
             {LESSON_TEXT}\n",
            timestamp = failure.timestamp,
            tool = failure.tool,
            path = failure.path,
            expected = failure.expected_hash,
            actual = failure.actual_hash,
        );

        match ward_utils_lockfile::append_with_lock(&session.paths.knowledge_file(), &block).await
        {
            Ok(()) => Ok(PostOutcome::ok_with(format!(
                "verification failure for {} recorded",
                failure.path
            ))),
            Err(err) => Ok(PostOutcome::failed(format!(
                "failed to append lesson: {err}"
            ))),
        }
    }
}
