use crate::{Error, LinkCategory, Resource, Result, SavedLink};

/// Saved links plus the single active resource.
///
/// The two halves are independent: removing a link never touches the active
/// resource, even when that resource was built from the removed link.
#[derive(Debug, Clone, Default)]
pub struct ResourceRegistry {
    links: Vec<SavedLink>,
    active: Option<Resource>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a link. Title and url must be non-empty; the url is not otherwise validated.
    pub fn add_link(
        &mut self,
        title: &str,
        url: &str,
        category: LinkCategory,
    ) -> Result<&SavedLink> {
        let title = title.trim();
        let url = url.trim();
        if title.is_empty() || url.is_empty() {
            return Err(Error::Validation("Title and URL required.".to_string()));
        }
        self.links.push(SavedLink {
            title: title.to_string(),
            url: url.to_string(),
            category,
        });
        Ok(&self.links[self.links.len() - 1])
    }

    pub fn remove_link(&mut self, index: usize) -> Result<SavedLink> {
        if index >= self.links.len() {
            return Err(Error::NotFound(format!(
                "no link at index {index} ({} saved)",
                self.links.len()
            )));
        }
        Ok(self.links.remove(index))
    }

    pub fn link(&self, index: usize) -> Result<&SavedLink> {
        self.links
            .get(index)
            .ok_or_else(|| Error::NotFound(format!("no link at index {index}")))
    }

    pub fn links(&self) -> &[SavedLink] {
        &self.links
    }

    pub fn set_active(&mut self, resource: Resource) -> &Resource {
        self.active.insert(resource)
    }

    pub fn active(&self) -> Option<&Resource> {
        self.active.as_ref()
    }

    pub fn active_name(&self) -> &str {
        self.active
            .as_ref()
            .map(|r| r.name.as_str())
            .unwrap_or("No resource selected")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with(titles: &[&str]) -> ResourceRegistry {
        let mut r = ResourceRegistry::new();
        for t in titles {
            r.add_link(t, &format!("https://example.com/{t}"), LinkCategory::General)
                .unwrap();
        }
        r
    }

    #[test]
    fn empty_title_or_url_is_rejected_without_side_effects() {
        let mut r = ResourceRegistry::new();
        let e = r.add_link("", "https://example.com", LinkCategory::Article);
        assert_eq!(e.unwrap_err(), Error::Validation("Title and URL required.".to_string()));
        assert!(r.add_link("Title", "   ", LinkCategory::Article).is_err());
        assert!(r.links().is_empty());
    }

    #[test]
    fn duplicates_are_kept_in_insertion_order() {
        let r = registry_with(&["a", "a", "b"]);
        let titles: Vec<&str> = r.links().iter().map(|l| l.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "a", "b"]);
    }

    #[test]
    fn remove_shifts_later_entries_and_keeps_relative_order() {
        for i in 0..4 {
            let mut r = registry_with(&["a", "b", "c", "d"]);
            let removed = r.remove_link(i).unwrap();
            assert_eq!(r.links().len(), 3);
            let mut expected = vec!["a", "b", "c", "d"];
            assert_eq!(removed.title, expected.remove(i));
            let titles: Vec<&str> = r.links().iter().map(|l| l.title.as_str()).collect();
            assert_eq!(titles, expected);
        }
    }

    #[test]
    fn remove_out_of_range_is_an_error() {
        let mut r = registry_with(&["a"]);
        assert!(matches!(r.remove_link(1), Err(Error::NotFound(_))));
        assert_eq!(r.links().len(), 1);
    }

    #[test]
    fn removing_the_link_behind_the_active_resource_keeps_the_snapshot() {
        let mut r = registry_with(&["a", "b"]);
        let link = r.link(0).unwrap().clone();
        r.set_active(Resource::link(&link, "page text"));
        r.remove_link(0).unwrap();
        let active = r.active().unwrap();
        assert_eq!(active.name, "a");
        assert_eq!(active.content, "page text");
    }

    #[test]
    fn set_active_replaces_wholesale() {
        let mut r = ResourceRegistry::new();
        assert_eq!(r.active_name(), "No resource selected");
        r.set_active(Resource::document("one.pdf", "first"));
        r.set_active(Resource::document("two.pdf", "second"));
        let a = r.active().unwrap();
        assert_eq!(a.name, "two.pdf");
        assert_eq!(a.content, "second");
    }
}
