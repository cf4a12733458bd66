//! Dotted-path resolution: `"server.listeners[1].port"` rooted at a
//! Config or Mold node, built on top of `find_elements`/`get_elements`.

use crate::context::Context;
use crate::error::{DisirError, DisirResult};

pub fn resolve(root: &Context, path: &str) -> DisirResult<Context> {
    if path.is_empty() {
        return Err(DisirError::InvalidArgument("empty path".to_string()));
    }

    let mut current = root.clone();
    for segment in path.split('.') {
        let (name, index) = parse_segment(segment)?;
        let candidates = current.find_elements(&name)?;
        let idx = index.unwrap_or(0);
        current = candidates
            .into_iter()
            .nth(idx)
            .ok_or_else(|| DisirError::NotExist(format!("'{segment}' not found")))?;
    }
    Ok(current)
}

fn parse_segment(segment: &str) -> DisirResult<(String, Option<usize>)> {
    match segment.find('[') {
        None => Ok((segment.to_string(), None)),
        Some(open) => {
            if !segment.ends_with(']') {
                return Err(DisirError::InvalidArgument(format!(
                    "malformed path segment: {segment}"
                )));
            }
            let name = &segment[..open];
            let index_str = &segment[open + 1..segment.len() - 1];
            let index: usize = index_str.parse().map_err(|_| {
                DisirError::InvalidArgument(format!("malformed index in: {segment}"))
            })?;
            Ok((name.to_string(), Some(index)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextKind;

    fn section_with_keyval(section_name: &str, keyval_name: &str) -> Context {
        let mold = Context::begin(None, ContextKind::Mold).unwrap();
        let section = Context::begin(Some(&mold), ContextKind::Section).unwrap();
        section.set_name(section_name.as_bytes()).unwrap();
        mold.attach_child(section_name, &section).unwrap();
        let keyval = Context::begin(Some(&section), ContextKind::Keyval).unwrap();
        keyval.set_name(keyval_name.as_bytes()).unwrap();
        section.attach_child(keyval_name, &keyval).unwrap();
        mold
    }

    #[test]
    fn resolves_nested_dotted_path() {
        let mold = section_with_keyval("server", "port");
        let found = mold.resolve("server.port").unwrap();
        assert_eq!(found.name().unwrap(), "port");
    }

    #[test]
    fn resolves_positional_selector() {
        let mold = Context::begin(None, ContextKind::Mold).unwrap();
        let a = Context::begin(Some(&mold), ContextKind::Section).unwrap();
        a.set_name(b"listener").unwrap();
        mold.attach_child("listener", &a).unwrap();
        let b = Context::begin(Some(&mold), ContextKind::Section).unwrap();
        b.set_name(b"listener").unwrap();
        mold.attach_child("listener", &b).unwrap();

        let found = mold.resolve("listener[1]").unwrap();
        assert!(found.is_same(&b));
    }

    #[test]
    fn missing_segment_is_not_exist() {
        let mold = Context::begin(None, ContextKind::Mold).unwrap();
        assert!(matches!(mold.resolve("nope"), Err(DisirError::NotExist(_))));
    }
}
