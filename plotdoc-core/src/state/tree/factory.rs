//! Construction of new widgets by type name.

use super::{TreeError, Widget, WidgetKind};
use crate::state::setting::SettingValue;

/// Children automatically created alongside a widget of this kind, with settings overrides.
fn autoadd_children(kind: WidgetKind) -> Vec<(&'static str, WidgetKind, Option<(&'static str, &'static str)>)> {
    match kind {
        WidgetKind::Graph => vec![
            ("x", WidgetKind::Axis, None),
            ("y", WidgetKind::Axis, Some(("direction", "vertical"))),
        ],
        _ => Vec::new(),
    }
}

/// Make a widget of `kind` and insert it under `parent`.
///
/// A missing name, or one already used by a sibling, is replaced by [`Widget::choose_name`].
/// `values` are setting paths relative to the new widget and their initial bindings. Everything
/// is checked before the widget is inserted, so on error `parent` is unchanged.
///
/// Returns the name the widget was given.
pub fn make_widget(
    parent: &mut Widget,
    kind: WidgetKind,
    autoadd: bool,
    name: Option<&str>,
    index: Option<usize>,
    values: &[(String, SettingValue)],
) -> Result<String, TreeError> {
    if !kind.allowed_parents().contains(&parent.kind()) {
        return Err(TreeError::NotAllowed {
            child: kind,
            parent: parent.kind(),
        });
    }
    let name = match name {
        Some(name) if Widget::check_name(name).is_ok() && parent.child(name).is_none() => {
            name.to_owned()
        }
        _ => parent.choose_name(kind),
    };
    let mut widget = Widget::new(kind, name.clone());
    for (path, value) in values {
        let segments: Vec<&str> = crate::state::path::segments(path).collect();
        let setting = widget
            .settings_mut()
            .lookup_mut(&segments)
            .ok_or_else(|| TreeError::UnknownSetting {
                kind,
                path: path.clone(),
            })?;
        setting
            .set(value.clone())
            .map_err(|source| TreeError::BadValue {
                path: path.clone(),
                source,
            })?;
    }
    if autoadd {
        for (child_name, child_kind, overrides) in autoadd_children(kind) {
            let mut child = Widget::new(child_kind, child_name);
            if let Some((setting, value)) = overrides {
                if let Some(setting) = child.settings_mut().setting_mut(setting) {
                    // Defaults are text, so this cannot mismatch.
                    let _ = setting.set(crate::state::setting::Value::Text(value.to_owned()).into());
                }
            }
            widget.insert_child(child, None)?;
        }
    }
    log::trace!("Made {kind} widget {name:?} under {:?}", parent.name());
    parent.insert_child(widget, index)?;
    Ok(name)
}
