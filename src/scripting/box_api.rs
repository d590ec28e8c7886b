//! `Box` userdata and its constructors.

use mlua::{Function, Lua, MetaMethod, MultiValue, Table, UserData, UserDataMethods, Value};

use super::marshal::{coord_table, unknown_member, unpack_args, vec3_table, CoordArg, Vec3Arg};
use crate::core::error::Error;
use crate::math::IAabb;
use crate::voxel::SelectionBox;

/// Script-side selection box. Boxes are plain values: the script gets its
/// own copy and nothing in the host refers back to it.
#[derive(Clone, Copy, Debug)]
pub struct ScriptBox(pub SelectionBox);

impl UserData for ScriptBox {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_method("iterVoxels", |lua, this, args: MultiValue| {
            let visitor: Function = unpack_args(lua, "Box.iterVoxels", 1, args)?;
            this.0
                .try_iter_voxels(|pos| visitor.call::<()>(coord_table(lua, pos)?))
        });

        methods.add_method("worldToLocal", |lua, this, args: MultiValue| {
            let CoordArg(pos) = unpack_args(lua, "Box.worldToLocal", 1, args)?;
            coord_table(lua, this.0.world_to_local(pos))
        });

        methods.add_method("contains", |lua, this, args: MultiValue| {
            let CoordArg(pos) = unpack_args(lua, "Box.contains", 1, args)?;
            Ok(this.0.contains(pos))
        });

        methods.add_method("size", |lua, this, args: MultiValue| {
            unpack_args::<()>(lua, "Box.size", 0, args)?;
            vec3_table(lua, this.0.size())
        });

        methods.add_meta_method(MetaMethod::Index, |_, _this, key: String| {
            Err::<Value, _>(unknown_member("Box", &key))
        });
    }
}

/// Build the global `Box` table: `Box(origin, ax, ay, az)`, `Box.new(...)`
/// and `Box.fromAabb(min, max)` with `max` exclusive.
pub fn create_box_table(lua: &Lua) -> mlua::Result<Table> {
    let table = lua.create_table()?;

    let new = lua.create_function(|lua, args: MultiValue| {
        let (Vec3Arg(origin), Vec3Arg(x), Vec3Arg(y), Vec3Arg(z)) =
            unpack_args(lua, "Box.new", 4, args)?;
        Ok(ScriptBox(SelectionBox::new(origin, x, y, z)))
    })?;
    table.raw_set("new", new.clone())?;

    table.raw_set(
        "fromAabb",
        lua.create_function(|lua, args: MultiValue| {
            let (CoordArg(min), CoordArg(max)) = unpack_args(lua, "Box.fromAabb", 2, args)?;
            let aabb = IAabb::new(min, max);
            if aabb.checked_size().is_none() {
                return Err(Error::marshal("Box.fromAabb", "extent does not fit in 32 bits").into());
            }
            Ok(ScriptBox(SelectionBox::from_aabb(aabb)))
        })?,
    )?;

    let meta = lua.create_table()?;
    meta.raw_set(
        "__call",
        lua.create_function(move |_, mut args: MultiValue| {
            // Drop the `Box` table itself.
            args.pop_front();
            new.call::<Value>(args)
        })?,
    )?;
    table.set_metatable(Some(meta));

    Ok(table)
}
