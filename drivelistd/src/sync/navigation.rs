use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Crumb {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationPath {
    crumbs: Vec<Crumb>,
}

impl NavigationPath {
    pub fn new(root_id: impl Into<String>, root_name: impl Into<String>) -> Self {
        Self {
            crumbs: vec![Crumb {
                id: root_id.into(),
                name: root_name.into(),
            }],
        }
    }

    pub fn current(&self) -> &Crumb {
        self.crumbs.last().unwrap_or(&self.crumbs[0])
    }

    pub fn crumbs(&self) -> &[Crumb] {
        &self.crumbs
    }

    pub fn push(&mut self, id: impl Into<String>, name: impl Into<String>) {
        self.crumbs.push(Crumb {
            id: id.into(),
            name: name.into(),
        });
    }

    pub fn truncate_to(&mut self, index: usize) -> bool {
        if index >= self.crumbs.len() {
            return false;
        }
        self.crumbs.truncate(index + 1);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_keeps_root_and_prefix() {
        let mut path = NavigationPath::new("root", "Archive");
        path.push("a", "2024");
        path.push("b", "March");
        assert_eq!(path.current().id, "b");

        assert!(path.truncate_to(1));
        assert_eq!(path.crumbs().len(), 2);
        assert_eq!(path.current().name, "2024");

        assert!(path.truncate_to(0));
        assert_eq!(path.current(), &path.crumbs()[0]);
        assert_eq!(path.crumbs().len(), 1);
    }

    #[test]
    fn truncate_out_of_range_is_rejected() {
        let mut path = NavigationPath::new("root", "Archive");
        assert!(!path.truncate_to(3));
        assert_eq!(path.crumbs().len(), 1);
    }
}
