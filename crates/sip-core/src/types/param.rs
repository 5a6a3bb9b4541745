use std::fmt;

/// A single `;name` or `;name=value` generic parameter (RFC 3261 §25.1
/// `generic-param`), used by headers that allow an open-ended parameter
/// list: Via, Contact, Route, Record-Route, To, From.
///
/// `value` distinguishes a flag parameter (`;lr`, `value: None`) from one
/// with an empty value (`;foo=`, `value: Some(String::new())`). Values
/// that came off the wire as a `quoted-string` keep `quoted: true` so
/// re-printing restores the quotes rather than guessing.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Param {
    pub name: String,
    pub value: Option<String>,
    pub quoted: bool,
}

impl Param {
    pub fn new(name: impl Into<String>) -> Self {
        Param { name: name.into(), value: None, quoted: false }
    }

    pub fn with_value(name: impl Into<String>, value: impl Into<String>) -> Self {
        Param { name: name.into(), value: Some(value.into()), quoted: false }
    }

    pub fn with_quoted_value(name: impl Into<String>, value: impl Into<String>) -> Self {
        Param { name: name.into(), value: Some(value.into()), quoted: true }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(v) = &self.value {
            if self.quoted {
                write!(f, "=\"{}\"", v.replace('\\', "\\\\").replace('"', "\\\""))?;
            } else {
                write!(f, "={}", v)?;
            }
        }
        Ok(())
    }
}

/// An ordered list of [`Param`]s shared by every header that carries
/// generic parameters. Kept as a `Vec` rather than a map: SIP parameter
/// order is significant for re-printing and duplicates are legal (if
/// semantically meaningless) on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct ParamList(pub Vec<Param>);

impl ParamList {
    pub fn new() -> Self {
        ParamList(Vec::new())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .and_then(|p| p.value.as_deref())
    }

    pub fn has(&self, name: &str) -> bool {
        self.0.iter().any(|p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(p) = self.0.iter_mut().find(|p| p.name.eq_ignore_ascii_case(&name)) {
            p.value = Some(value);
        } else {
            self.0.push(Param::with_value(name, value));
        }
    }

    pub fn set_flag(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.has(&name) {
            self.0.push(Param::new(name));
        }
    }

    pub fn remove(&mut self, name: &str) {
        self.0.retain(|p| !p.name.eq_ignore_ascii_case(name));
    }

    pub fn push(&mut self, param: Param) {
        self.0.push(param);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Param> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ParamList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for p in &self.0 {
            write!(f, ";{}", p)?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a ParamList {
    type Item = &'a Param;
    type IntoIter = std::slice::Iter<'a, Param>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<Param> for ParamList {
    fn from_iter<T: IntoIterator<Item = Param>>(iter: T) -> Self {
        ParamList(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_param_prints_without_equals() {
        let mut list = ParamList::new();
        list.set_flag("lr");
        assert_eq!(list.to_string(), ";lr");
    }

    #[test]
    fn quoted_value_escapes_on_print() {
        let p = Param::with_quoted_value("tag", "a\"b");
        assert_eq!(p.to_string(), "tag=\"a\\\"b\"");
    }

    #[test]
    fn set_replaces_existing_value_in_place() {
        let mut list = ParamList::new();
        list.set("transport", "udp");
        list.set("transport", "tcp");
        assert_eq!(list.get("transport"), Some("tcp"));
        assert_eq!(list.0.len(), 1);
    }
}
