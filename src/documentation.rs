//! Versioned documentation strings attached to Config, Mold, Section,
//! Keyval and Restriction nodes (§4.6).

use crate::context::{Context, ContextKind, DocumentationData, Variant};
use crate::error::{DisirError, DisirResult};
use crate::value::Value;
use crate::version::Version;

const DOC_CONTEXTS: &[ContextKind] = &[
    ContextKind::Config,
    ContextKind::Mold,
    ContextKind::Section,
    ContextKind::Keyval,
    ContextKind::Restriction,
];

impl Context {
    /// Adds a documentation entry introduced at `version`. Two entries on
    /// the same node introduced at the same version is `exists`.
    pub fn add_documentation(&self, introduced: Version, text: &str) -> DisirResult<Context> {
        self.guard_kind(DOC_CONTEXTS)?;

        if self
            .documentation_entries()
            .iter()
            .any(|d| d.introduced == introduced)
        {
            return Err(DisirError::Exists(format!(
                "documentation already introduced at {introduced}"
            )));
        }

        let doc = Context::from_inner(crate::context::ContextInner {
            kind: ContextKind::Documentation,
            state: crate::context::ContextState::Constructing,
            invalid: false,
            fatal: false,
            attached_to_parent: true,
            parent: Some(self.clone()),
            root_kind: None,
            error: None,
            variant: Variant::Documentation(DocumentationData {
                introduced,
                text: Value::String(text.as_bytes().to_vec()),
            }),
        });
        doc.finalize()?;

        let mut inner = self.0.borrow_mut();
        match &mut inner.variant {
            Variant::Config(_) => {
                return Err(DisirError::WrongContext(
                    "CONFIG does not carry its own documentation list".to_string(),
                ))
            }
            Variant::Mold(m) => m.documentation.push(doc.clone()),
            Variant::Section(s) => s.documentation.push(doc.clone()),
            Variant::Keyval(k) => k.documentation.push(doc.clone()),
            Variant::Restriction(r) => r.documentation.push(doc.clone()),
            _ => unreachable!("guarded above"),
        }
        Ok(doc)
    }

    /// The documentation text active at `version`: the entry with the
    /// greatest `introduced <= version`, or the overall-greatest if none
    /// qualifies (same resolution rule as defaults and restrictions).
    pub fn get_documentation(&self, version: &Version) -> DisirResult<Option<String>> {
        self.guard_kind(DOC_CONTEXTS)?;
        let entries = self.documentation_entries();
        Ok(crate::version::active_at(&entries, version, |d| d.introduced)
            .map(|d| d.text.stringify()))
    }

    pub(crate) fn documentation_entries(&self) -> Vec<DocumentationData> {
        let inner = self.0.borrow();
        let docs: &[Context] = match &inner.variant {
            Variant::Mold(m) => &m.documentation,
            Variant::Section(s) => &s.documentation,
            Variant::Keyval(k) => &k.documentation,
            Variant::Restriction(r) => &r.documentation,
            _ => return Vec::new(),
        };
        docs.iter()
            .map(|d| {
                let doc_inner = d.0.borrow();
                match &doc_inner.variant {
                    Variant::Documentation(data) => DocumentationData {
                        introduced: data.introduced,
                        text: data.text.clone(),
                    },
                    _ => unreachable!("documentation list holds only Documentation nodes"),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextKind;

    #[test]
    fn duplicate_version_is_exists() {
        let mold = Context::begin(None, ContextKind::Mold).unwrap();
        mold.add_documentation(Version::new(1, 0), "first").unwrap();
        let err = mold.add_documentation(Version::new(1, 0), "second");
        assert!(matches!(err, Err(DisirError::Exists(_))));
    }

    #[test]
    fn resolves_to_active_version() {
        let mold = Context::begin(None, ContextKind::Mold).unwrap();
        mold.add_documentation(Version::new(1, 0), "v1").unwrap();
        mold.add_documentation(Version::new(2, 0), "v2").unwrap();
        assert_eq!(
            mold.get_documentation(&Version::new(1, 5)).unwrap(),
            Some("v1".to_string())
        );
        assert_eq!(
            mold.get_documentation(&Version::new(3, 0)).unwrap(),
            Some("v2".to_string())
        );
    }

    #[test]
    fn wrong_context_on_config() {
        let mold = Context::begin(None, ContextKind::Mold).unwrap();
        mold.finalize().unwrap();
        let config = crate::config::begin_config(&mold).unwrap();
        assert!(matches!(
            config.add_documentation(Version::new(1, 0), "x"),
            Err(DisirError::WrongContext(_))
        ));
    }
}
