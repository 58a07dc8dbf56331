//! Field references and dotted field chains

use std::fmt;

use serde_json::Value;

/// A dotted path of property names, such as `group.curator.name`.
///
/// Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldChain {
    items: Vec<String>,
}

impl FieldChain {
    /// Builds a chain from its items; `None` if there are none or any is blank
    pub fn new<I, S>(items: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let items: Vec<String> = items.into_iter().map(Into::into).collect();
        if items.is_empty() || items.iter().any(|item| item.trim().is_empty()) {
            return None;
        }
        Some(Self { items })
    }

    /// Parses a dotted path
    pub fn parse(path: &str) -> Option<Self> {
        Self::new(path.split('.'))
    }

    /// One-hop chain
    pub fn single(name: impl Into<String>) -> Self {
        Self {
            items: vec![name.into()],
        }
    }

    /// Item at `index`
    ///
    /// Panics if `index >= item_count()`.
    pub fn item_name(&self, index: usize) -> &str {
        &self.items[index]
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// More than one hop
    pub fn is_long(&self) -> bool {
        self.items.len() > 1
    }

    pub fn first(&self) -> &str {
        &self.items[0]
    }

    pub fn last(&self) -> &str {
        &self.items[self.items.len() - 1]
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }
}

impl fmt::Display for FieldChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.items.join("."))
    }
}

/// One step of a field reference
#[derive(Debug, Clone, PartialEq)]
pub enum FieldItem {
    /// Property access
    Field(String),
    /// Method applied to the preceding value, e.g. `name.toLowerCase()`
    Method { name: String, args: Vec<Value> },
}

/// A field reference as written in a condition
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRef {
    items: Vec<FieldItem>,
}

impl FieldRef {
    /// Reference to a plain dotted path
    pub fn path(path: &str) -> Self {
        Self {
            items: path
                .split('.')
                .map(|name| FieldItem::Field(name.to_string()))
                .collect(),
        }
    }

    pub fn from_items(items: Vec<FieldItem>) -> Self {
        Self { items }
    }

    /// Appends a method call
    pub fn with_method(mut self, name: impl Into<String>, args: Vec<Value>) -> Self {
        self.items.push(FieldItem::Method {
            name: name.into(),
            args,
        });
        self
    }

    pub fn items(&self) -> &[FieldItem] {
        &self.items
    }

    /// The plain field chain, or `None` if any step is not a property access
    pub fn field_chain(&self) -> Option<FieldChain> {
        let names = self
            .items
            .iter()
            .map(|item| match item {
                FieldItem::Field(name) => Some(name.clone()),
                FieldItem::Method { .. } => None,
            })
            .collect::<Option<Vec<_>>>()?;
        FieldChain::new(names)
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            match item {
                FieldItem::Field(name) => write!(f, "{}", name)?,
                FieldItem::Method { name, args } => {
                    let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
                    write!(f, "{}({})", name, args.join(", "))?;
                }
            }
        }
        Ok(())
    }
}
