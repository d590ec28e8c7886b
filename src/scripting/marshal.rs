//! Conversion of coordinates, colors and argument lists across the Lua boundary.
//!
//! Coordinates and colors cross as plain numeric tables, never as host
//! handles. Inputs may be arrays (`{1, 2, 3}`) or named tables
//! (`{x = 1, y = 2, z = 3}`); outputs carry both forms.

use mlua::{FromLua, FromLuaMulti, Lua, MultiValue, Table, Value};

use crate::core::error::Error;
use crate::core::types::{IVec3, Vec3};
use crate::voxel::Color;

/// Voxel coordinate argument
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CoordArg(pub IVec3);

/// Voxel color argument, channels 0..=255
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColorArg(pub Color);

/// Floating point vector argument (box origin and axes)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vec3Arg(pub Vec3);

fn type_error(expected: &str, value: &Value) -> mlua::Error {
    mlua::Error::FromLuaConversionError {
        from: value.type_name(),
        to: expected.to_string(),
        message: None,
    }
}

/// Read `table[index]` or `table[name]`, whichever is present.
fn component(table: &Table, index: i64, name: &str) -> mlua::Result<Value> {
    let value: Value = table.raw_get(index)?;
    if !value.is_nil() {
        return Ok(value);
    }
    table.raw_get(name)
}

fn integer_component(table: &Table, index: i64, name: &str, what: &str) -> mlua::Result<i64> {
    match component(table, index, name)? {
        Value::Integer(i) => Ok(i),
        Value::Number(n) if n.fract() == 0.0 && n.abs() < i64::MAX as f64 => Ok(n as i64),
        other => Err(mlua::Error::FromLuaConversionError {
            from: other.type_name(),
            to: what.to_string(),
            message: Some(format!("component '{name}' must be an integer")),
        }),
    }
}

fn number_component(table: &Table, index: i64, name: &str, what: &str) -> mlua::Result<f32> {
    match component(table, index, name)? {
        Value::Integer(i) => Ok(i as f32),
        Value::Number(n) => Ok(n as f32),
        other => Err(mlua::Error::FromLuaConversionError {
            from: other.type_name(),
            to: what.to_string(),
            message: Some(format!("component '{name}' must be a number")),
        }),
    }
}

impl FromLua for CoordArg {
    fn from_lua(value: Value, _lua: &Lua) -> mlua::Result<Self> {
        let Value::Table(table) = &value else {
            return Err(type_error("coordinate", &value));
        };
        let mut out = [0i32; 3];
        for (i, name) in ["x", "y", "z"].into_iter().enumerate() {
            let v = integer_component(table, i as i64 + 1, name, "coordinate")?;
            out[i] = i32::try_from(v).map_err(|_| mlua::Error::FromLuaConversionError {
                from: "integer",
                to: "coordinate".to_string(),
                message: Some(format!("component '{name}' out of range: {v}")),
            })?;
        }
        Ok(CoordArg(IVec3::from_array(out)))
    }
}

impl FromLua for ColorArg {
    fn from_lua(value: Value, _lua: &Lua) -> mlua::Result<Self> {
        let Value::Table(table) = &value else {
            return Err(type_error("color", &value));
        };
        let mut out = [0u8; 4];
        for (i, name) in ["r", "g", "b", "a"].into_iter().enumerate() {
            let v = integer_component(table, i as i64 + 1, name, "color")?;
            out[i] = u8::try_from(v).map_err(|_| mlua::Error::FromLuaConversionError {
                from: "integer",
                to: "color".to_string(),
                message: Some(format!("channel '{name}' must be in 0..255, got {v}")),
            })?;
        }
        Ok(ColorArg(Color::from_array(out)))
    }
}

impl FromLua for Vec3Arg {
    fn from_lua(value: Value, _lua: &Lua) -> mlua::Result<Self> {
        let Value::Table(table) = &value else {
            return Err(type_error("vector", &value));
        };
        let mut out = [0f32; 3];
        for (i, name) in ["x", "y", "z"].into_iter().enumerate() {
            out[i] = number_component(table, i as i64 + 1, name, "vector")?;
        }
        Ok(Vec3Arg(Vec3::from_array(out)))
    }
}

/// `{x, y, z, x = x, y = y, z = z}`
pub fn coord_table(lua: &Lua, pos: IVec3) -> mlua::Result<Table> {
    let table = lua.create_table_with_capacity(3, 3)?;
    for (i, (name, v)) in [("x", pos.x), ("y", pos.y), ("z", pos.z)].into_iter().enumerate() {
        table.raw_set(i + 1, v)?;
        table.raw_set(name, v)?;
    }
    Ok(table)
}

/// `{r, g, b, a, r = r, g = g, b = b, a = a}`
pub fn color_table(lua: &Lua, color: Color) -> mlua::Result<Table> {
    let table = lua.create_table_with_capacity(4, 4)?;
    let channels = [("r", color.r), ("g", color.g), ("b", color.b), ("a", color.a)];
    for (i, (name, v)) in channels.into_iter().enumerate() {
        table.raw_set(i + 1, v)?;
        table.raw_set(name, v)?;
    }
    Ok(table)
}

/// `{x, y, z, x = x, y = y, z = z}` with float components
pub fn vec3_table(lua: &Lua, v: Vec3) -> mlua::Result<Table> {
    let table = lua.create_table_with_capacity(3, 3)?;
    for (i, (name, c)) in [("x", v.x), ("y", v.y), ("z", v.z)].into_iter().enumerate() {
        table.raw_set(i + 1, c)?;
        table.raw_set(name, c)?;
    }
    Ok(table)
}

/// Error raised by the `__index` fallback of bridged types.
pub fn unknown_member(type_name: &str, key: &str) -> mlua::Error {
    mlua::Error::runtime(format!("{type_name} has no member '{key}'"))
}

/// Unpack a bridged call's arguments, enforcing the exact argument count.
///
/// Errors name the method so scripts see e.g.
/// `Volume.setAt: expected 2 argument(s), got 1`.
pub fn unpack_args<T: FromLuaMulti>(
    lua: &Lua,
    method: &str,
    expected: usize,
    args: MultiValue,
) -> mlua::Result<T> {
    if args.len() != expected {
        return Err(Error::marshal(
            method,
            format!("expected {} argument(s), got {}", expected, args.len()),
        )
        .into());
    }
    lua.unpack_multi::<T>(args)
        .map_err(|e| Error::marshal(method, e.to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval<T: FromLua>(lua: &Lua, src: &str) -> mlua::Result<T> {
        lua.load(src).eval::<T>()
    }

    #[test]
    fn test_coord_array_and_named() {
        let lua = Lua::new();
        let a: CoordArg = eval(&lua, "return {1, -2, 3}").unwrap();
        let b: CoordArg = eval(&lua, "return {x = 1, y = -2, z = 3}").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.0, IVec3::new(1, -2, 3));
    }

    #[test]
    fn test_coord_rejects_fraction() {
        let lua = Lua::new();
        let err = eval::<CoordArg>(&lua, "return {1.5, 0, 0}").unwrap_err();
        assert!(err.to_string().contains("must be an integer"));
        assert!(eval::<CoordArg>(&lua, "return 'nope'").is_err());
        assert!(eval::<CoordArg>(&lua, "return {1, 2}").is_err());
    }

    #[test]
    fn test_color_range() {
        let lua = Lua::new();
        let c: ColorArg = eval(&lua, "return {255, 0, 10, 255}").unwrap();
        assert_eq!(c.0, Color::new(255, 0, 10, 255));
        let err = eval::<ColorArg>(&lua, "return {256, 0, 0, 255}").unwrap_err();
        assert!(err.to_string().contains("0..255"));
        assert!(eval::<ColorArg>(&lua, "return {-1, 0, 0, 255}").is_err());
    }

    #[test]
    fn test_tables_carry_both_forms() {
        let lua = Lua::new();
        lua.globals().set("p", coord_table(&lua, IVec3::new(4, 5, 6)).unwrap()).unwrap();
        lua.globals().set("c", color_table(&lua, Color::new(1, 2, 3, 4)).unwrap()).unwrap();
        let ok: bool = eval(&lua, "return p[1] == p.x and p.z == 6 and c[4] == c.a and c.r == 1").unwrap();
        assert!(ok);
    }

    #[test]
    fn test_unpack_args_arity() {
        let lua = Lua::new();
        let args = MultiValue::from_iter([Value::Integer(1)]);
        let err = unpack_args::<(i64, i64)>(&lua, "Volume.setAt", 2, args).unwrap_err();
        assert!(err.to_string().contains("Volume.setAt: expected 2 argument(s), got 1"));

        let args = MultiValue::from_iter([Value::Integer(1), Value::Integer(2)]);
        let (a, b) = unpack_args::<(i64, i64)>(&lua, "f", 2, args).unwrap();
        assert_eq!((a, b), (1, 2));
    }
}
