//! Portal configuration.

use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use serde::Deserialize;

use crate::dom::Element;
use crate::error::Result;
use crate::host::Template;
use crate::reactive::ChangeDetect;

/// Where portal content is attached.
#[derive(Clone, Default)]
pub enum Target {
    /// The document body.
    #[default]
    Body,
    /// Directly under the portal element.
    Host,
    Element(Element),
    /// Resolved on every attach. `None` falls back to the portal element.
    Resolver(Rc<dyn Fn() -> Option<Element>>),
}

impl Target {
    pub fn resolver<F>(resolve: F) -> Self
    where
        F: Fn() -> Option<Element> + 'static,
    {
        Self::Resolver(Rc::new(resolve))
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Body => f.write_str("Body"),
            Self::Host => f.write_str("Host"),
            Self::Element(element) => f.debug_tuple("Element").field(element).finish(),
            Self::Resolver(_) => f.write_str("Resolver(..)"),
        }
    }
}

impl ChangeDetect for Target {
    fn has_changed(&self, old: &Self) -> bool {
        match (self, old) {
            (Self::Body, Self::Body) | (Self::Host, Self::Host) => false,
            (Self::Element(element), Self::Element(old)) => element != old,
            (Self::Resolver(resolve), Self::Resolver(old)) => !Rc::ptr_eq(resolve, old),
            _ => true,
        }
    }
}

/// Declared inputs of a portal.
///
/// Deserializes from an attribute map such as
/// `{"disabled": true, "disable-delay": 200, "content": "<p>hi</p>"}`. The
/// target is a property, not an attribute, and is always [`Target::Body`]
/// after deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PortalConfig {
    #[serde(skip)]
    pub target: Target,

    /// Disables rendering of the content.
    pub disabled: bool,

    /// Milliseconds to keep rendering after being disabled, e.g. for exit
    /// animations.
    #[serde(rename = "disable-delay")]
    pub disable_delay: Option<u64>,

    /// Content to render under the target.
    pub content: Option<Template>,
}

impl PortalConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn disable_delay(&self) -> Option<Duration> {
        self.disable_delay.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;
    use crate::error::Error;

    #[test]
    fn parses_attribute_names() {
        let config = PortalConfig::from_json(
            r#"{"disabled": true, "disable-delay": 200, "content": "<p>hi</p>"}"#,
        )
        .unwrap();

        assert!(config.disabled);
        assert_eq!(config.disable_delay(), Some(Duration::from_millis(200)));
        assert_eq!(config.content, Some(Template::new("<p>hi</p>")));
        assert!(matches!(config.target, Target::Body));
    }

    #[test]
    fn missing_attributes_use_defaults() {
        let config = PortalConfig::from_json("{}").unwrap();

        assert!(!config.disabled);
        assert_eq!(config.disable_delay, None);
        assert_eq!(config.content, None);
    }

    #[test]
    fn rejects_unknown_attributes() {
        assert!(matches!(
            PortalConfig::from_json(r#"{"disableDelay": 10}"#),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn targets_compare_by_identity() {
        let document = Document::new();
        let a = document.create_element("div");
        let b = document.create_element("div");
        let resolve = Target::resolver(|| None);

        assert!(!Target::Element(a.clone()).has_changed(&Target::Element(a.clone())));
        assert!(Target::Element(a).has_changed(&Target::Element(b)));
        assert!(!resolve.has_changed(&resolve.clone()));
        assert!(Target::resolver(|| None).has_changed(&resolve));
        assert!(Target::Body.has_changed(&Target::Host));
    }
}
