//! Script host: owns the Lua VM and the registries scripts fill in.

use std::cell::{Ref, RefCell};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use mlua::{Function, Lua, Table};

use super::api::{register_all, ApiState, ScriptLogEntry};
use super::box_api::ScriptBox;
use super::handles::{BridgeStats, ImageRef};
use super::image_api::ScriptImage;
use super::registry::{CommandRegistry, FormatMode, FormatRegistry};
use super::sandbox::{create_sandboxed_vm, enable_strict_globals};
use crate::core::config::EngineConfig;
use crate::core::error::Error;
use crate::core::types::Result;
use crate::voxel::Image;

/// Registries hold Lua functions and are emptied before the VM closes.
pub struct ScriptHost {
    state: ApiState,
    lua: Lua,
}

impl ScriptHost {
    /// Create a VM for the configured trust level and install the API.
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let lua = create_sandboxed_vm(config.trust_level)?;
        let state = ApiState::new();
        register_all(&lua, &state)?;
        // Empty until a script is run with arguments.
        lua.globals().raw_set("arg", lua.create_table()?)?;
        if config.strict_globals {
            enable_strict_globals(&lua)?;
        }
        Ok(Self { state, lua })
    }

    /// Run a chunk of Lua source.
    pub fn run_string(&self, source: &str, chunk_name: &str) -> Result<()> {
        self.lua
            .load(source)
            .set_name(format!("={chunk_name}"))
            .exec()?;
        Ok(())
    }

    /// Run a script file.
    pub fn run_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| Error::Open {
            path: path.display().to_string(),
            source,
        })?;
        log::debug!("Running script {}", path.display());
        self.lua
            .load(source)
            .set_name(format!("@{}", path.display()))
            .exec()?;
        Ok(())
    }

    /// Run a script file with a global `arg` table: `arg[0]` is the path and
    /// `arg[1..]` are `args`, as with the standalone Lua interpreter.
    pub fn run_file_with_args(&self, path: impl AsRef<Path>, args: &[String]) -> Result<()> {
        let path = path.as_ref();
        let arg = self.lua.create_table()?;
        arg.raw_set(0, path.display().to_string())?;
        for (i, value) in args.iter().enumerate() {
            arg.raw_set(i + 1, value.as_str())?;
        }
        self.lua.globals().raw_set("arg", arg)?;
        self.run_file(path)
    }

    /// Run every `*.lua` file in `dir`, sorted by file name. A failing
    /// script is logged and skipped. Returns the number that ran cleanly.
    pub fn load_dir(&self, dir: impl AsRef<Path>) -> Result<usize> {
        let dir = dir.as_ref();
        let mut scripts: Vec<PathBuf> = std::fs::read_dir(dir)
            .map_err(|source| Error::Open {
                path: dir.display().to_string(),
                source,
            })?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "lua"))
            .collect();
        scripts.sort();

        let mut loaded = 0;
        for path in &scripts {
            match self.run_file(path) {
                Ok(()) => loaded += 1,
                Err(e) => log::error!("Failed to load script {}: {}", path.display(), e),
            }
        }
        log::info!("Loaded {}/{} scripts from {}", loaded, scripts.len(), dir.display());
        Ok(loaded)
    }

    fn goxel_table(&self) -> Result<Table> {
        Ok(self.lua.globals().raw_get("goxel")?)
    }

    /// Publish the editor context as `goxel.image`, `goxel.selection` and `goxel.frame`.
    pub fn install_context(&self, image: &Rc<RefCell<Image>>, frame: u64) -> Result<()> {
        let goxel = self.goxel_table()?;
        let selection = image
            .try_borrow()
            .map_err(|_| Error::Busy("image".to_string()))?
            .selection()
            .copied()
            .map(ScriptBox);
        goxel.raw_set("image", self.script_image(image))?;
        goxel.raw_set("selection", selection)?;
        goxel.raw_set("frame", frame)?;
        Ok(())
    }

    fn script_image(&self, image: &Rc<RefCell<Image>>) -> ScriptImage {
        ScriptImage::new(ImageRef::new(image), &self.state.stats)
    }

    fn format_callback(&self, path: &str, format: Option<&str>, mode: FormatMode) -> Result<Function> {
        let formats = self.state.formats.borrow();
        if let Some(handler) = formats.for_path(path, format, mode) {
            if let Some(callback) = handler.callback(mode) {
                return Ok(callback.clone());
            }
        }
        // Distinguish a known format lacking this direction from no match at all.
        match format.and_then(|name| formats.get(name)) {
            Some(handler) => Err(Error::UnsupportedOperation {
                format: handler.name.clone(),
                operation: mode.as_str(),
            }),
            None => Err(Error::FormatNotFound(format.unwrap_or(path).to_string())),
        }
    }

    /// Call the matching handler as `export(image, path)`.
    pub fn export(&self, image: &Rc<RefCell<Image>>, path: &str, format: Option<&str>) -> Result<()> {
        let callback = self.format_callback(path, format, FormatMode::Export)?;
        log::info!("Exporting {}", path);
        callback.call::<()>((self.script_image(image), path))?;
        Ok(())
    }

    /// Call the matching handler as `import(image, path)`.
    pub fn import(&self, image: &Rc<RefCell<Image>>, path: &str, format: Option<&str>) -> Result<()> {
        let callback = self.format_callback(path, format, FormatMode::Import)?;
        log::info!("Importing {}", path);
        callback.call::<()>((self.script_image(image), path))?;
        Ok(())
    }

    /// Invoke a registered command's `onExecute()`.
    pub fn execute(&self, name: &str) -> Result<()> {
        let on_execute = self
            .state
            .commands
            .borrow()
            .get(name)
            .map(|command| command.on_execute.clone())
            .ok_or_else(|| Error::CommandNotFound(name.to_string()))?;
        log::debug!("Executing command '{}'", name);
        on_execute.call::<()>(())?;
        Ok(())
    }

    pub fn formats(&self) -> Ref<'_, FormatRegistry> {
        self.state.formats.borrow()
    }

    pub fn commands(&self) -> Ref<'_, CommandRegistry> {
        self.state.commands.borrow()
    }

    pub fn stats(&self) -> &BridgeStats {
        &self.state.stats
    }

    /// Drain the lines logged by scripts since the last call.
    pub fn take_output(&self) -> Vec<ScriptLogEntry> {
        self.state.output.borrow_mut().drain(..).collect()
    }

    /// Run a full GC cycle, finalizing unreachable handles.
    pub fn collect_garbage(&self) -> Result<()> {
        // Twice: the first cycle may only mark userdata for finalization.
        self.lua.gc_collect()?;
        self.lua.gc_collect()?;
        Ok(())
    }

    pub fn lua(&self) -> &Lua {
        &self.lua
    }
}

impl Drop for ScriptHost {
    fn drop(&mut self) {
        // Release the stored Lua functions while the VM is still alive.
        if let Ok(mut formats) = self.state.formats.try_borrow_mut() {
            formats.clear();
        }
        if let Ok(mut commands) = self.state.commands.try_borrow_mut() {
            commands.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::IVec3;
    use crate::voxel::Color;
    use tempfile::TempDir;

    const EXPORT_TXT: &str = r#"
        goxel.registerFormat{
            name = "txt",
            ext = "text\0*.txt\0",
            export = function(image, path)
                local file = std.open(path, "w")
                image:getLayersVolume():iter(function(p, c)
                    file:printf("%d %d %d %02x%02x%02x\n", p.x, p.y, p.z, c.r, c.g, c.b)
                end)
                file:close()
            end,
        }
    "#;

    fn host() -> ScriptHost {
        ScriptHost::new(&EngineConfig::default()).expect("host")
    }

    #[test]
    fn test_export_through_handler() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let host = host();
        host.run_string(EXPORT_TXT, "export_txt").unwrap();

        let image = Rc::new(RefCell::new(Image::new()));
        image
            .borrow_mut()
            .active_layer_mut()
            .unwrap()
            .volume_mut()
            .set_at(IVec3::new(1, 2, 3), Color::rgb(255, 0, 16));

        let path = temp_dir.path().join("out.TXT");
        host.export(&image, &path.to_string_lossy(), None).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "1 2 3 ff0010\n");
    }

    #[test]
    fn test_export_errors() {
        let host = host();
        host.run_string(
            r#"goxel.registerFormat{name = "in", ext = "*.in", import = function() end}"#,
            "import_only",
        )
        .unwrap();
        let image = Rc::new(RefCell::new(Image::new()));
        assert!(matches!(host.export(&image, "a.png", None), Err(Error::FormatNotFound(_))));
        assert!(matches!(
            host.export(&image, "a.in", Some("in")),
            Err(Error::UnsupportedOperation { .. })
        ));
    }

    #[test]
    fn test_strict_globals_catch_typos() {
        let host = host();
        let err = host.run_string("local x = undefined_name", "typo").unwrap_err();
        assert!(err.to_string().contains("undefined global 'undefined_name'"));
    }

    #[test]
    fn test_context_selection_absent() {
        let host = host();
        let image = Rc::new(RefCell::new(Image::new()));
        host.install_context(&image, 7).unwrap();
        host.run_string(
            r#"
            goxel.registerScript{
                name = "Fill selection",
                onExecute = function()
                    local box = goxel.selection
                    if not box then
                        log.warn("no selection")
                        return
                    end
                    local vol = goxel.image.activeLayer.volume
                    box:iterVoxels(function(p) vol:setAt(p, {255, 255, 255, 255}) end)
                end,
            }
            "#,
            "fill",
        )
        .unwrap();

        host.execute("Fill selection").unwrap();
        assert!(image.borrow().active_layer().unwrap().volume().is_empty());
        let output = host.take_output();
        assert_eq!(output.last().unwrap().message, "no selection");
    }

    #[test]
    fn test_execute_unknown_command() {
        let host = host();
        assert!(matches!(host.execute("nope"), Err(Error::CommandNotFound(_))));
    }

    #[test]
    fn test_load_dir_skips_failures() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        std::fs::write(temp_dir.path().join("a_good.lua"), EXPORT_TXT).unwrap();
        std::fs::write(temp_dir.path().join("b_bad.lua"), "this is not lua").unwrap();
        std::fs::write(
            temp_dir.path().join("c_cmd.lua"),
            r#"goxel.registerScript{name = "Noop", onExecute = function() end}"#,
        )
        .unwrap();
        std::fs::write(temp_dir.path().join("notes.txt"), "ignored").unwrap();

        let host = host();
        let loaded = host.load_dir(temp_dir.path()).unwrap();
        assert_eq!(loaded, 2);
        assert_eq!(host.formats().len(), 1);
        assert_eq!(host.commands().len(), 1);
    }

    #[test]
    fn test_run_file_with_args() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let script = temp_dir.path().join("args.lua");
        std::fs::write(
            &script,
            r#"
            goxel.registerScript{name = "Echo", onExecute = function(...)
                log.info(#arg, arg[1], arg[2], ...)
            end}
            goxel.call("Echo", "via call")
            "#,
        )
        .unwrap();

        let host = host();
        host.run_file_with_args(&script, &["red".to_string(), "8".to_string()])
            .unwrap();
        let output = host.take_output();
        assert_eq!(output.last().unwrap().message, "2\tred\t8\tvia call");
        let script_name: String = host.lua().load("return arg[0]").eval().unwrap();
        assert!(script_name.ends_with("args.lua"));
    }

    #[test]
    fn test_collect_garbage_finalizes_owned() {
        let host = host();
        host.run_string("for i = 1, 100 do local v = Volume() end", "alloc").unwrap();
        host.collect_garbage().unwrap();
        assert_eq!(host.stats().live_owned(), 0);
        assert_eq!(host.stats().finalized_owned(), 100);
    }
}
