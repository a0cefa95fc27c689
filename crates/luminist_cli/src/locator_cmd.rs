//! `luminist locator` subcommands.

use anyhow::Result;
use luminist_core::pipeline::codec;
use luminist_core::pipeline::encoder::{decode_prompt, encode_prompt};
use luminist_core::{apply_directive, Directive};

use crate::LocatorCommands;

pub fn run(command: LocatorCommands) -> Result<()> {
    match command {
        LocatorCommands::Parse { locator } => {
            let parsed = codec::parse(&locator)?;
            println!("origin: {}", parsed.base.origin());
            println!("path: /{}", parsed.base.segments().join("/"));
            if parsed.pipeline.is_empty() {
                println!("directives: (none)");
            }
            for directive in &parsed.pipeline {
                println!("{}", describe(directive));
            }
        }
        LocatorCommands::Flip { locator, direction } => {
            println!("{}", apply_directive(&locator, Directive::Flip(direction))?);
        }
        LocatorCommands::Edit { locator, prompt } => {
            let directive = encode_prompt(&prompt)?;
            println!("{}", apply_directive(&locator, directive)?);
        }
    }
    Ok(())
}

fn describe(directive: &Directive) -> String {
    let family = directive.family().as_str();
    match directive {
        Directive::Flip(direction) => format!("- {family}: {directive} (flip {})", direction.describe()),
        Directive::PromptEdit {
            payload,
            encoded: false,
        } => format!("- {family}: {directive} (plain token {payload:?})"),
        Directive::PromptEdit { encoded: true, .. } => match decode_prompt(directive) {
            Ok(prompt) => format!("- {family}: {directive} (prompt {prompt:?})"),
            Err(err) => format!("- {family}: {directive} (undecodable: {err})"),
        },
        Directive::Irregular { .. } => format!("- {family}: {directive} (non-canonical)"),
        Directive::Opaque(_) => format!("- {family}: {directive}"),
    }
}

#[cfg(test)]
mod tests {
    use super::describe;
    use luminist_core::Directive;

    #[test]
    fn plain_prompt_is_shown_as_its_wire_token() {
        let line = describe(&Directive::classify("e-edit-prompt-snake_case"));
        assert_eq!(
            line,
            "- edit-prompt: e-edit-prompt-snake_case (plain token \"snake_case\")"
        );
    }

    #[test]
    fn non_canonical_flip_keeps_flip_family() {
        assert_eq!(
            describe(&Directive::classify("fl-v_h")),
            "- flip: fl-v_h (non-canonical)"
        );
    }
}
