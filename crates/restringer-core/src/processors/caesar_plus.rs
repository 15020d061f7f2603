//! Caesar-family bundle: the payload usually hides behind an outer
//! `eval`/IIFE layer built from `fromCharCode`/`charCodeAt` shifting.
//! Preprocessing unwraps that outer layer so the main loop can work on
//! the real script; postprocessing clears the decoder scaffolding that
//! remains.

use super::{ObfuscationKind, Processor};
use crate::rules::NamedRule;

pub fn processor() -> Processor {
    Processor {
        kind: ObfuscationKind::CaesarPlus,
        preprocessors: vec![
            NamedRule {
                name: "unfold-eval-literals",
                run: crate::rules::functions::unfold_eval_literals,
            },
            NamedRule {
                name: "evaluate-eval-arguments",
                run: crate::rules::evaluated::evaluate_eval_arguments,
            },
            NamedRule {
                name: "unwrap-iife-initializers",
                run: crate::rules::functions::unwrap_iife_initializers,
            },
        ],
        postprocessors: vec![
            NamedRule {
                name: "remove-dead-declarations",
                run: crate::rules::variables::remove_dead_declarations,
            },
            NamedRule {
                name: "normalize-empty-statements",
                run: crate::rules::control_flow::normalize_empty_statements,
            },
        ],
    }
}
