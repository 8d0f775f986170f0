//! Element Registry
//!
//! Maps custom element names to constructors. Each name can be defined
//! exactly once per thread; defining it again is an error rather than a
//! silent replacement.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::dom::Document;
use crate::error::{Error, Result};
use crate::host::Component;
use crate::portal::{Portal, PortalConfig, PortalVariant};
use crate::timer::Scheduler;

/// Creates a new component instance in a document.
pub type Constructor = Rc<dyn Fn(&Rc<Document>) -> Result<Rc<dyn Component>>>;

/// Names that look like custom element names but are reserved.
const RESERVED_NAMES: [&str; 8] = [
    "annotation-xml",
    "color-profile",
    "font-face",
    "font-face-src",
    "font-face-uri",
    "font-face-format",
    "font-face-name",
    "missing-glyph",
];

thread_local! {
    static REGISTRY: RefCell<IndexMap<String, Constructor>> = RefCell::new(IndexMap::new());
}

/// Whether `name` is usable as a custom element name: starts with a
/// lowercase ASCII letter, contains a hyphen, has no uppercase ASCII letters
/// and is not reserved.
pub fn is_valid_name(name: &str) -> bool {
    name.starts_with(|c: char| c.is_ascii_lowercase())
        && name.contains('-')
        && !name.chars().any(|c| c.is_ascii_uppercase() || c.is_whitespace())
        && !RESERVED_NAMES.contains(&name)
}

/// Registers `constructor` under `name`.
pub fn define<F>(name: &str, constructor: F) -> Result<()>
where
    F: Fn(&Rc<Document>) -> Result<Rc<dyn Component>> + 'static,
{
    if !is_valid_name(name) {
        return Err(Error::InvalidElementName { name: name.to_owned() });
    }

    REGISTRY.with(|registry| {
        let mut registry = registry.borrow_mut();
        if registry.contains_key(name) {
            return Err(Error::AlreadyRegistered { name: name.to_owned() });
        }

        registry.insert(name.to_owned(), Rc::new(constructor));
        tracing::debug!(name, "element defined");
        Ok(())
    })
}

pub fn is_defined(name: &str) -> bool {
    REGISTRY.with(|registry| registry.borrow().contains_key(name))
}

/// Defined names, in definition order.
pub fn defined_names() -> Vec<String> {
    REGISTRY.with(|registry| registry.borrow().keys().cloned().collect())
}

/// Creates an instance of the element defined as `name`.
pub fn create(document: &Rc<Document>, name: &str) -> Result<Rc<dyn Component>> {
    let constructor = REGISTRY
        .with(|registry| registry.borrow().get(name).cloned())
        .ok_or_else(|| Error::UnknownElement { name: name.to_owned() })?;

    // Constructors may define further elements, so the registry is not
    // borrowed while one runs.
    constructor(document)
}

/// Defines `x-portal` and `x-portal-light-dom`, both scheduling exit
/// transitions on `scheduler`.
pub fn define_portals(scheduler: Rc<dyn Scheduler>) -> Result<()> {
    for variant in [PortalVariant::Shadow, PortalVariant::LightDom] {
        let scheduler = Rc::clone(&scheduler);
        define(variant.tag(), move |document| {
            let portal = Portal::new(document, Rc::clone(&scheduler), variant, PortalConfig::default())?;
            Ok(Rc::clone(portal.host()) as Rc<dyn Component>)
        })?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portal::{LIGHT_DOM_PORTAL_TAG, PORTAL_TAG};
    use crate::timer::ManualClock;

    #[test]
    fn validates_names() {
        assert!(is_valid_name("x-portal"));
        assert!(is_valid_name("my-element2"));
        assert!(!is_valid_name("portal"));
        assert!(!is_valid_name("X-portal"));
        assert!(!is_valid_name("2-portal"));
        assert!(!is_valid_name("font-face"));
    }

    fn light_portal(document: &Rc<Document>) -> Result<Rc<dyn Component>> {
        let portal = Portal::new(document, ManualClock::new(), PortalVariant::LightDom, PortalConfig::default())?;
        Ok(Rc::clone(portal.host()) as Rc<dyn Component>)
    }

    #[test]
    fn redefining_a_name_is_an_error() {
        define("x-defined-once", light_portal).unwrap();

        assert!(is_defined("x-defined-once"));
        assert!(matches!(
            define("x-defined-once", light_portal),
            Err(Error::AlreadyRegistered { .. })
        ));
    }

    #[test]
    fn creates_defined_elements() {
        if !is_defined(LIGHT_DOM_PORTAL_TAG) {
            define_portals(ManualClock::new()).unwrap();
        }
        let document = Document::new();

        let portal = create(&document, LIGHT_DOM_PORTAL_TAG).unwrap();
        assert_eq!(portal.element().tag(), LIGHT_DOM_PORTAL_TAG);
        assert!(defined_names().iter().any(|name| name == PORTAL_TAG));

        assert!(matches!(
            create(&document, "x-missing"),
            Err(Error::UnknownElement { .. })
        ));
    }

    #[test]
    fn rejects_invalid_names() {
        let result = define("Portal", light_portal);
        assert!(matches!(result, Err(Error::InvalidElementName { .. })));
    }
}
