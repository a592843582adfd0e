/// Something that resolves to an element: a CSS selector or a handle.
#[derive(Debug, Clone, PartialEq)]
pub enum Target<H> {
    Selector(String),
    Element(H),
}

impl<H> Target<H> {
    pub fn selector<S: Into<String>>(selector: S) -> Self {
        Target::Selector(selector.into())
    }

    pub fn element(handle: H) -> Self {
        Target::Element(handle)
    }
}

impl<H> From<&str> for Target<H> {
    fn from(selector: &str) -> Self {
        Target::Selector(selector.to_string())
    }
}

impl<H> From<String> for Target<H> {
    fn from(selector: String) -> Self {
        Target::Selector(selector)
    }
}

impl<H> From<&String> for Target<H> {
    fn from(selector: &String) -> Self {
        Target::Selector(selector.clone())
    }
}
