use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::block::BlockContent;

const MARKUP_SCHEMA: &str = "phase-blocks";
const MARKUP_VERSION: u32 = 1;

fn default_schema() -> String {
    MARKUP_SCHEMA.to_string()
}

fn default_version() -> u32 {
    MARKUP_VERSION
}

/// The markup string crossing the persistence boundary: a versioned JSON
/// envelope around the block sequence. The format promises structural
/// round-trip fidelity, not byte-identical output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct MarkupEnvelope {
    #[serde(default = "default_schema")]
    schema: String,
    #[serde(default = "default_version")]
    version: u32,
    blocks: Vec<BlockContent>,
}

#[derive(Debug, Error)]
pub enum MarkupError {
    #[error("malformed note markup: {0}")]
    Malformed(#[from] serde_json::Error),
}

pub fn serialize_contents(contents: &[BlockContent]) -> Result<String, MarkupError> {
    let envelope = MarkupEnvelope {
        schema: default_schema(),
        version: default_version(),
        blocks: contents.to_vec(),
    };
    Ok(serde_json::to_string(&envelope)?)
}

/// Parses previously serialized markup. Blank input and an empty block list
/// both yield the canonical empty document, a single blank paragraph, so a
/// parse never produces zero blocks.
pub fn parse_contents(input: &str) -> Result<Vec<BlockContent>, MarkupError> {
    if input.trim().is_empty() {
        return Ok(vec![BlockContent::paragraph("")]);
    }
    let envelope: MarkupEnvelope = serde_json::from_str(input)?;
    let mut blocks = envelope.blocks;
    if blocks.is_empty() {
        blocks.push(BlockContent::paragraph(""));
    }
    Ok(blocks)
}
