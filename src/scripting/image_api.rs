//! `Image` and `Layer` userdata exposed to scripts.
//!
//! Both hold only weak references into the host image and resolve them on
//! every access.

use std::rc::Rc;

use mlua::{MetaMethod, MultiValue, UserData, UserDataFields, UserDataMethods, Value};

use super::box_api::ScriptBox;
use super::handles::{BridgeStats, ImageRef, LayerRef};
use super::marshal::{unknown_member, unpack_args};
use super::volume_api::ScriptVolume;

pub struct ScriptImage {
    image: ImageRef,
    stats: Rc<BridgeStats>,
}

impl ScriptImage {
    pub fn new(image: ImageRef, stats: &Rc<BridgeStats>) -> Self {
        Self {
            image,
            stats: Rc::clone(stats),
        }
    }

    fn active_layer(&self) -> mlua::Result<Option<ScriptLayer>> {
        let active = self.image.read(|image| image.active_layer_id())?;
        Ok(active.map(|id| ScriptLayer {
            layer: LayerRef::new(self.image.clone(), id),
            stats: Rc::clone(&self.stats),
        }))
    }

    fn selection(&self) -> mlua::Result<Option<ScriptBox>> {
        Ok(self.image.read(|image| image.selection().copied())?.map(ScriptBox))
    }

    fn layers_volume(&self) -> mlua::Result<ScriptVolume> {
        let merged = self.image.read(|image| image.layers_volume())?;
        Ok(ScriptVolume::merged(merged, &self.stats))
    }
}

impl UserData for ScriptImage {
    fn add_fields<F: UserDataFields<Self>>(fields: &mut F) {
        fields.add_field_method_get("activeLayer", |_, this| this.active_layer());
        fields.add_field_method_get("layer", |_, this| this.active_layer());
        fields.add_field_method_get("selectionBox", |_, this| this.selection());
        fields.add_field_method_get("selection", |_, this| this.selection());
        fields.add_field_method_get("layerCount", |_, this| {
            Ok(this.image.read(|image| image.layer_count())?)
        });
    }

    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_method("addLayer", |lua, this, args: MultiValue| {
            unpack_args::<()>(lua, "Image.addLayer", 0, args)?;
            let id = this.image.write(|image| image.add_layer())?;
            Ok(ScriptLayer {
                layer: LayerRef::new(this.image.clone(), id),
                stats: Rc::clone(&this.stats),
            })
        });

        methods.add_method("getLayersVolume", |lua, this, args: MultiValue| {
            unpack_args::<()>(lua, "Image.getLayersVolume", 0, args)?;
            this.layers_volume()
        });

        // No meshing in the core: the merged volume stands in for the mesh.
        methods.add_method("getLayersMesh", |lua, this, args: MultiValue| {
            unpack_args::<()>(lua, "Image.getLayersMesh", 0, args)?;
            this.layers_volume()
        });

        methods.add_meta_method(MetaMethod::Index, |_, _this, key: String| {
            Err::<Value, _>(unknown_member("Image", &key))
        });
    }
}

pub struct ScriptLayer {
    layer: LayerRef,
    stats: Rc<BridgeStats>,
}

impl UserData for ScriptLayer {
    fn add_fields<F: UserDataFields<Self>>(fields: &mut F) {
        fields.add_field_method_get("id", |_, this| Ok(this.layer.id().0));

        fields.add_field_method_get("name", |_, this| {
            Ok(this.layer.read(|layer| layer.name.clone())?)
        });
        fields.add_field_method_set("name", |_, this, name: String| {
            Ok(this.layer.write(|layer| layer.name = name)?)
        });

        fields.add_field_method_get("visible", |_, this| {
            Ok(this.layer.read(|layer| layer.visible)?)
        });
        fields.add_field_method_set("visible", |_, this, visible: bool| {
            Ok(this.layer.write(|layer| layer.visible = visible)?)
        });

        // A new borrowed handle per access; it fails once the layer is removed.
        fields.add_field_method_get("volume", |_, this| {
            this.layer.read(|_| ())?;
            Ok(ScriptVolume::borrowed(this.layer.clone(), &this.stats))
        });
    }

    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_meta_method(MetaMethod::Index, |_, _this, key: String| {
            Err::<Value, _>(unknown_member("Layer", &key))
        });
        methods.add_meta_method(MetaMethod::Eq, |_, this, other: mlua::AnyUserData| {
            let other = other.borrow::<ScriptLayer>()?;
            Ok(this.layer.id() == other.layer.id())
        });
    }
}
