//! Usage guidance surfaced to the orchestrator at session start.
//!
//! Exposed verbatim in the init message and nowhere else; the text has no
//! behavioral effect on the relay.

/// Guidance for the planning model on how to use the relay effectively.
pub const INSTRUCTIONS: &str = "\
This relay runs batches of text-transformation tasks on a local model so \
you can delegate mechanical work instead of doing it inline.

Ground rules:
- Delegate mechanical, well-specified transforms: format conversions, \
boilerplate generation, bulk rewrites, extraction. Keep judgment calls for \
yourself.
- Pilot before you scale. Submit one or two tasks, inspect the results, \
refine the prompts, then submit the full batch.
- Use input_file and output_file (absolute paths) for zero-context \
transforms: the relay reads the input, appends it to your prompt, and \
writes the result to disk so the content never passes through you.
- Give batch-mates a shared tag so one check_tasks or cancel_tasks call \
covers the whole batch.
- submit_tasks returns immediately. Poll with check_tasks (cheap, no \
content) and fetch only what you need with get_result.
- Tasks that wrote their output to disk return empty content from \
get_result; read the file instead.
- A failed task keeps its engine output when the failure happened after \
generation (file write, post-write command), so you can still recover it \
via get_result.
- Nothing is retried automatically. Resubmit failed tasks yourself, \
ideally with a sharper prompt.";
