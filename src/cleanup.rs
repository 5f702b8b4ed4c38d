//! Normalisation of raw model text before parsing

use crate::request::RequestKind;

const FENCE: &str = "```";

/// Remove markdown code-fence markers (with any language tag
/// that follows an opening fence) and surrounding whitespace.
pub fn strip_fences(text: &str) -> String
{   let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find(FENCE)
    {   out.push_str(&rest[..pos]);
        rest = &rest[pos + FENCE.len()..];
        let tag_len = rest
          .find(|c: char| !c.is_ascii_alphanumeric())
          .unwrap_or(rest.len());
        rest = &rest[tag_len..];
    }
    out.push_str(rest);
    out.trim().to_string()
}

/// Substring from the first '{' to the last '}' inclusive.
/// Text without a usable pair passes through unchanged.
pub fn extract_json_object(text: &str) -> &str
{   match (text.find('{'), text.rfind('}'))
    {   (Some(open), Some(close)) if open < close => {
          &text[open..=close]
        }
      , _ => text
    }
}

/// Full cleanup step for one response
pub fn clean_response(raw: &str, kind: RequestKind) -> String
{   let stripped = strip_fences(raw);
    if kind.is_structured()
    {   extract_json_object(&stripped).to_string()
    } else
    {   stripped
    }
}
