//! Registries filled by scripts: file formats and editor commands.
//!
//! Registration keeps insertion order; re-registering a name replaces the
//! existing entry in place. Names compare ASCII case-insensitively for both
//! registration and lookup. There is no unregistration.

use mlua::Function;

/// Direction of a format handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormatMode {
    Import,
    Export,
}

impl FormatMode {
    pub fn as_str(self) -> &'static str {
        match self {
            FormatMode::Import => "import",
            FormatMode::Export => "export",
        }
    }
}

/// Script-provided importer and/or exporter.
#[derive(Clone, Debug)]
pub struct FormatHandler {
    pub name: String,
    /// Shown in file dialogs
    pub description: String,
    /// Glob patterns such as `*.txt`
    pub patterns: Vec<String>,
    /// Called as `import(image, path)`
    pub import: Option<Function>,
    /// Called as `export(image, path)`
    pub export: Option<Function>,
}

impl FormatHandler {
    pub fn supports(&self, mode: FormatMode) -> bool {
        self.callback(mode).is_some()
    }

    pub fn callback(&self, mode: FormatMode) -> Option<&Function> {
        match mode {
            FormatMode::Import => self.import.as_ref(),
            FormatMode::Export => self.export.as_ref(),
        }
    }

    /// Case-insensitive match of `path` against the handler's patterns.
    pub fn matches_path(&self, path: &str) -> bool {
        let path = path.to_ascii_lowercase();
        self.patterns.iter().any(|pattern| {
            let pattern = pattern.to_ascii_lowercase();
            match pattern.strip_prefix('*') {
                Some(suffix) => path.ends_with(suffix),
                None => path == pattern || path.ends_with(&format!("/{pattern}")),
            }
        })
    }
}

/// Split an extension string into an optional description and patterns.
///
/// Accepts `*.txt`, `*.txt;*.text`, and the NUL-separated legacy form
/// `"Text\0*.txt\0"` whose first field is the description.
pub fn parse_ext_patterns(ext: &str) -> (Option<String>, Vec<String>) {
    let mut description = None;
    let mut patterns = Vec::new();
    for (i, field) in ext.split('\0').filter(|f| !f.is_empty()).enumerate() {
        if i == 0 && !field.contains('*') && ext.contains('\0') {
            description = Some(field.to_string());
            continue;
        }
        patterns.extend(
            field
                .split(';')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string),
        );
    }
    (description, patterns)
}

#[derive(Debug, Default)]
pub struct FormatRegistry {
    handlers: Vec<FormatHandler>,
}

impl FormatRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handler. Returns true if it replaced one with the same name.
    pub fn register(&mut self, handler: FormatHandler) -> bool {
        if let Some(existing) = self
            .handlers
            .iter_mut()
            .find(|h| h.name.eq_ignore_ascii_case(&handler.name))
        {
            log::info!("Replacing file format '{}'", handler.name);
            *existing = handler;
            true
        } else {
            log::info!("Registered file format '{}' ({})", handler.name, handler.patterns.join(", "));
            self.handlers.push(handler);
            false
        }
    }

    pub fn get(&self, name: &str) -> Option<&FormatHandler> {
        self.handlers.iter().find(|h| h.name.eq_ignore_ascii_case(name))
    }

    /// First handler supporting `mode` whose patterns match `path` and, when
    /// `name` is given, whose name matches too.
    pub fn for_path(&self, path: &str, name: Option<&str>, mode: FormatMode) -> Option<&FormatHandler> {
        self.handlers.iter().find(|h| {
            h.supports(mode)
                && name.is_none_or(|n| h.name.eq_ignore_ascii_case(n))
                && h.matches_path(path)
        })
    }

    /// Handlers supporting `mode`, in registration order.
    pub fn iter(&self, mode: FormatMode) -> impl Iterator<Item = &FormatHandler> {
        self.handlers.iter().filter(move |h| h.supports(mode))
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.handlers.clear();
    }
}

/// Script-provided editor action.
#[derive(Clone, Debug)]
pub struct ScriptCommand {
    pub name: String,
    pub description: Option<String>,
    pub on_execute: Function,
}

#[derive(Debug, Default)]
pub struct CommandRegistry {
    commands: Vec<ScriptCommand>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a command. Returns true if it replaced one with the same name.
    pub fn register(&mut self, command: ScriptCommand) -> bool {
        if let Some(existing) = self
            .commands
            .iter_mut()
            .find(|c| c.name.eq_ignore_ascii_case(&command.name))
        {
            log::info!("Replacing script command '{}'", command.name);
            *existing = command;
            true
        } else {
            log::info!("Registered script command '{}'", command.name);
            self.commands.push(command);
            false
        }
    }

    pub fn get(&self, name: &str) -> Option<&ScriptCommand> {
        self.commands.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScriptCommand> {
        self.commands.iter()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.commands.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mlua::Lua;

    fn handler(lua: &Lua, name: &str, patterns: &[&str], export: bool, import: bool) -> FormatHandler {
        let f = lua.create_function(|_, ()| Ok(())).unwrap();
        FormatHandler {
            name: name.to_string(),
            description: name.to_string(),
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
            import: import.then(|| f.clone()),
            export: export.then(|| f.clone()),
        }
    }

    #[test]
    fn test_parse_ext_patterns() {
        assert_eq!(parse_ext_patterns("*.txt"), (None, vec!["*.txt".to_string()]));
        assert_eq!(
            parse_ext_patterns("Text file\0*.txt\0"),
            (Some("Text file".to_string()), vec!["*.txt".to_string()])
        );
        assert_eq!(parse_ext_patterns("*.gltf;*.glb").1, vec!["*.gltf", "*.glb"]);
        assert!(parse_ext_patterns("").1.is_empty());
    }

    #[test]
    fn test_register_replaces_in_place() {
        let lua = Lua::new();
        let mut registry = FormatRegistry::new();
        assert!(!registry.register(handler(&lua, "txt", &["*.txt"], true, false)));
        assert!(!registry.register(handler(&lua, "vox", &["*.vox"], true, true)));
        assert!(registry.register(handler(&lua, "txt", &["*.text"], true, false)));

        assert_eq!(registry.len(), 2);
        let names: Vec<_> = registry.iter(FormatMode::Export).map(|h| h.name.as_str()).collect();
        assert_eq!(names, vec!["txt", "vox"]);
        assert_eq!(registry.get("txt").unwrap().patterns, vec!["*.text"]);
    }

    #[test]
    fn test_for_path() {
        let lua = Lua::new();
        let mut registry = FormatRegistry::new();
        registry.register(handler(&lua, "vox", &["*.vox"], false, true));
        registry.register(handler(&lua, "magica", &["*.vox"], true, false));
        registry.register(handler(&lua, "txt", &["*.txt"], true, false));

        let found = registry.for_path("/tmp/OUT.VOX", None, FormatMode::Export).unwrap();
        assert_eq!(found.name, "magica");
        let found = registry.for_path("in.vox", None, FormatMode::Import).unwrap();
        assert_eq!(found.name, "vox");
        assert!(registry.for_path("a.txt", Some("vox"), FormatMode::Export).is_none());
        assert!(registry.for_path("a.png", None, FormatMode::Export).is_none());
        assert!(registry.for_path("a.txt", Some("TXT"), FormatMode::Export).is_some());
    }

    #[test]
    fn test_command_registry() {
        let lua = Lua::new();
        let f = lua.create_function(|_, ()| Ok(())).unwrap();
        let mut registry = CommandRegistry::new();
        registry.register(ScriptCommand {
            name: "Dilate".to_string(),
            description: None,
            on_execute: f.clone(),
        });
        let replaced = registry.register(ScriptCommand {
            name: "Dilate".to_string(),
            description: Some("grow by one voxel".to_string()),
            on_execute: f,
        });
        assert!(replaced);
        assert_eq!(registry.len(), 1);
        assert!(registry.get("Dilate").unwrap().description.is_some());
        assert!(registry.get("DILATE").is_some());

        let lua_fn = lua.create_function(|_, ()| Ok(())).unwrap();
        assert!(registry.register(ScriptCommand {
            name: "dilate".to_string(),
            description: None,
            on_execute: lua_fn,
        }));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("Dilate").unwrap().name, "dilate");
    }

    #[test]
    fn test_register_name_differing_in_case_replaces() {
        let lua = Lua::new();
        let mut registry = FormatRegistry::new();
        assert!(!registry.register(handler(&lua, "Text", &["*.txt"], true, false)));
        assert!(registry.register(handler(&lua, "text", &["*.text"], true, true)));

        assert_eq!(registry.len(), 1);
        let found = registry.get("TEXT").unwrap();
        assert_eq!(found.name, "text");
        assert_eq!(found.patterns, vec!["*.text"]);
        let by_path = registry.for_path("a.text", Some("Text"), FormatMode::Import).unwrap();
        assert_eq!(by_path.name, "text");
    }
}
