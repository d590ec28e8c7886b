//! `Volume` userdata exposed to scripts.

use std::rc::Rc;

use mlua::{Function, MetaMethod, MultiValue, UserData, UserDataMethods, Value};

use super::handles::{BridgeStats, LayerRef, VolumeHandle};
use super::marshal::{color_table, coord_table, unknown_member, unpack_args, ColorArg, CoordArg};
use crate::voxel::Volume;

/// Script-side volume object.
///
/// Dropping the userdata (Lua `__gc`) releases owned and merged volumes;
/// borrowed handles leave the layer untouched.
pub struct ScriptVolume {
    handle: VolumeHandle,
    stats: Rc<BridgeStats>,
}

impl ScriptVolume {
    fn new(handle: VolumeHandle, stats: &Rc<BridgeStats>) -> Self {
        stats.on_created(handle.is_owned());
        Self {
            handle,
            stats: Rc::clone(stats),
        }
    }

    /// New volume owned by the script
    pub fn owned(volume: Volume, stats: &Rc<BridgeStats>) -> Self {
        Self::new(VolumeHandle::Owned(volume.into()), stats)
    }

    /// Read-only merged view
    pub fn merged(volume: Rc<Volume>, stats: &Rc<BridgeStats>) -> Self {
        Self::new(VolumeHandle::Merged(volume), stats)
    }

    /// View of a layer volume owned by the host image
    pub fn borrowed(layer: LayerRef, stats: &Rc<BridgeStats>) -> Self {
        Self::new(VolumeHandle::Borrowed(layer), stats)
    }

    pub fn handle(&self) -> &VolumeHandle {
        &self.handle
    }
}

impl Drop for ScriptVolume {
    fn drop(&mut self) {
        self.stats.on_finalized(self.handle.is_owned());
    }
}

impl UserData for ScriptVolume {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_method("get", |lua, this, args: MultiValue| {
            let CoordArg(pos) = unpack_args(lua, "Volume.get", 1, args)?;
            let color = this.handle.read(|v| v.get(pos))?;
            color_table(lua, color)
        });

        methods.add_method("setAt", |lua, this, args: MultiValue| {
            let (CoordArg(pos), ColorArg(color)) = unpack_args(lua, "Volume.setAt", 2, args)?;
            this.handle.write(|v| v.set_at(pos, color))?;
            Ok(())
        });

        // The visitor sees a snapshot taken before the first call, so it may
        // freely write to this volume (or any other) while iterating.
        methods.add_method("iter", |lua, this, args: MultiValue| {
            let visitor: Function = unpack_args(lua, "Volume.iter", 1, args)?;
            let snapshot = this.handle.snapshot()?;
            for (pos, color) in snapshot.iter() {
                visitor.call::<()>((coord_table(lua, pos)?, color_table(lua, color)?))?;
            }
            Ok(())
        });

        methods.add_method("copy", |lua, this, args: MultiValue| {
            unpack_args::<()>(lua, "Volume.copy", 0, args)?;
            let snapshot = this.handle.snapshot()?;
            Ok(ScriptVolume::owned(snapshot, &this.stats))
        });

        methods.add_method("clear", |lua, this, args: MultiValue| {
            unpack_args::<()>(lua, "Volume.clear", 0, args)?;
            this.handle.write(Volume::clear)?;
            Ok(())
        });

        methods.add_method("isEmpty", |lua, this, args: MultiValue| {
            unpack_args::<()>(lua, "Volume.isEmpty", 0, args)?;
            Ok(this.handle.read(Volume::is_empty)?)
        });

        methods.add_method("count", |lua, this, args: MultiValue| {
            unpack_args::<()>(lua, "Volume.count", 0, args)?;
            Ok(this.handle.read(Volume::len)?)
        });

        // nil for an empty volume, otherwise {min = ..., max = ...}, both inclusive.
        methods.add_method("bbox", |lua, this, args: MultiValue| {
            unpack_args::<()>(lua, "Volume.bbox", 0, args)?;
            let Some((min, max)) = this.handle.read(Volume::bbox)? else {
                return Ok(Value::Nil);
            };
            let table = lua.create_table()?;
            table.raw_set("min", coord_table(lua, min)?)?;
            table.raw_set("max", coord_table(lua, max)?)?;
            Ok(Value::Table(table))
        });

        methods.add_meta_method(MetaMethod::Index, |_, _this, key: String| {
            Err::<Value, _>(unknown_member("Volume", &key))
        });

        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| {
            let kind = match this.handle {
                VolumeHandle::Owned(_) => "owned",
                VolumeHandle::Merged(_) => "merged",
                VolumeHandle::Borrowed(_) => "layer",
            };
            Ok(format!("Volume({kind})"))
        });
    }
}
