//! Tree search over parsed HTML.
//!
//! Searches are driven by small named predicates instead of ad-hoc closures,
//! so the same matcher (say "a `div`/`span` with an attribute mentioning
//! `value`") can be reused and tested on its own.

use scraper::ElementRef;

/// Decides whether a single element is a match.
pub trait NodePredicate {
    fn matches(&self, el: &ElementRef<'_>) -> bool;
}

/// Element with the given tag name.
#[derive(Debug, Clone)]
pub struct Tag(pub String);

impl Tag {
    pub fn new(tag: &str) -> Self {
        Self(tag.to_string())
    }
}

impl NodePredicate for Tag {
    fn matches(&self, el: &ElementRef<'_>) -> bool {
        el.value().name() == self.0
    }
}

/// Element with the given tag carrying every listed class.
#[derive(Debug, Clone)]
pub struct TagWithClasses {
    pub tag: String,
    pub classes: Vec<String>,
}

impl TagWithClasses {
    pub fn new(tag: &str, classes: &[&str]) -> Self {
        Self {
            tag: tag.to_string(),
            classes: classes.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl NodePredicate for TagWithClasses {
    fn matches(&self, el: &ElementRef<'_>) -> bool {
        let element = el.value();
        element.name() == self.tag
            && self
                .classes
                .iter()
                .all(|wanted| element.classes().any(|c| c == wanted))
    }
}

/// Element with the given tag whose attribute equals a value exactly.
#[derive(Debug, Clone)]
pub struct TagWithAttr {
    pub tag: String,
    pub attr: String,
    pub value: String,
}

impl TagWithAttr {
    pub fn new(tag: &str, attr: &str, value: &str) -> Self {
        Self {
            tag: tag.to_string(),
            attr: attr.to_string(),
            value: value.to_string(),
        }
    }

    pub fn id(tag: &str, id: &str) -> Self {
        Self::new(tag, "id", id)
    }
}

impl NodePredicate for TagWithAttr {
    fn matches(&self, el: &ElementRef<'_>) -> bool {
        el.value().name() == self.tag && el.value().attr(&self.attr) == Some(self.value.as_str())
    }
}

/// Element of one of `tags` where any attribute value contains `needle`.
#[derive(Debug, Clone)]
pub struct AttrValueContains {
    pub tags: Vec<String>,
    pub needle: String,
}

impl AttrValueContains {
    pub fn new(tags: &[&str], needle: &str) -> Self {
        Self {
            tags: tags.iter().map(|t| t.to_string()).collect(),
            needle: needle.to_string(),
        }
    }
}

impl NodePredicate for AttrValueContains {
    fn matches(&self, el: &ElementRef<'_>) -> bool {
        let element = el.value();
        self.tags.iter().any(|t| t == element.name())
            && element.attrs().any(|(_, v)| v.contains(self.needle.as_str()))
    }
}

/// Matches when any of the wrapped predicates does.
pub struct AnyOf(pub Vec<Box<dyn NodePredicate + Send + Sync>>);

impl AnyOf {
    pub fn new(preds: Vec<Box<dyn NodePredicate + Send + Sync>>) -> Self {
        Self(preds)
    }
}

impl NodePredicate for AnyOf {
    fn matches(&self, el: &ElementRef<'_>) -> bool {
        self.0.iter().any(|p| p.matches(el))
    }
}

/// First descendant of `root` (excluding `root`) matching `pred`, in document order.
pub fn find_first<'a, P>(root: ElementRef<'a>, pred: &P) -> Option<ElementRef<'a>>
where
    P: NodePredicate + ?Sized,
{
    descendants(root).find(|el| pred.matches(el))
}

/// All descendants of `root` matching `pred`, in document order.
pub fn find_all<'a, P>(root: ElementRef<'a>, pred: &P) -> Vec<ElementRef<'a>>
where
    P: NodePredicate + ?Sized,
{
    descendants(root).filter(|el| pred.matches(el)).collect()
}

/// Concatenated text of the element and its descendants, trimmed.
pub fn text_of(el: &ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn descendants<'a>(root: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    root.descendants().skip(1).filter_map(ElementRef::wrap)
}
