// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The system-prompt fragment passed to the agent as a command-line
//! argument, selected between two fixed templates based on observed
//! indexer health (spec.md §4.7, §6).

use ajob_core::job::IndexStatus;

const INDEXER_AVAILABLE: &str = "The repository has been indexed. Prefer the agent's semantic-search subcommand over plain text search when looking for relevant code.";

const INDEXER_UNAVAILABLE: &str = "No code index is available for this repository. Fall back to classic text search (grep-style) to locate relevant code.";

/// Chooses the system-prompt fragment for an agent invocation. Indexer
/// start/reconcile failures never fail the job — they only change which
/// fragment is selected here.
pub fn fragment_for(index_status: IndexStatus) -> &'static str {
    match index_status {
        IndexStatus::Ready => INDEXER_AVAILABLE,
        IndexStatus::Unavailable | IndexStatus::Skipped => INDEXER_UNAVAILABLE,
    }
}

#[cfg(test)]
#[path = "system_prompt_tests.rs"]
mod tests;
