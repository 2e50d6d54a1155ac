//! In-page element collection.
//!
//! One injected pass enumerates every element matching the closed set of
//! interactive roles, filters out anything a user could not actually see
//! or hit, and returns a compact JSON array in traversal order. All
//! geometry is viewport-relative.

use serde::{Deserialize, Serialize};

/// The closed set of semantic roles considered interactive.
pub const INTERACTIVE_ROLES: &[&str] = &[
    "button",
    "link",
    "textbox",
    "checkbox",
    "radio",
    "combobox",
    "listbox",
    "menuitem",
    "tab",
    "slider",
    "spinbutton",
    "searchbox",
    "switch",
    "menubar",
    "toolbar",
    "tree",
    "grid",
    "table",
    "option",
    "menuitemcheckbox",
    "menuitemradio",
    "listitem",
    "group",
    "region",
    "dialog",
    "alertdialog",
    "tooltip",
    "gridcell",
    "cell",
    "row",
];

/// Minimum on-screen size for an element to count as targetable.
pub const MIN_ELEMENT_SIZE_PX: i32 = 8;

/// The collection script. Acceptance requires ALL of: positive size of at
/// least 8x8, non-negative position, not transparent, not hidden, not
/// clipped out of an ancestor's overflow region, top-most at its center
/// (the hit test rejects elements obscured by overlays), and at least one
/// of text / image / background / interactive attribute.
pub const COLLECT_ELEMENTS_JS: &str = r#"
(() => {
  const ROLES = new Set(['button','link','textbox','checkbox','radio','combobox',
    'listbox','menuitem','tab','slider','spinbutton','searchbox','switch','menubar',
    'toolbar','tree','grid','table','option','menuitemcheckbox','menuitemradio',
    'listitem','group','region','dialog','alertdialog','tooltip','gridcell','cell','row']);
  const IMPLICIT = {
    a: 'link', button: 'button', input: 'textbox', textarea: 'textbox',
    select: 'combobox', option: 'option', table: 'table', li: 'listitem',
    tr: 'row', td: 'cell', th: 'cell', dialog: 'dialog'
  };
  const MIN = 8;

  const roleOf = (el) => {
    const explicit = el.getAttribute('role');
    if (explicit) return explicit;
    const tag = el.tagName.toLowerCase();
    if (tag === 'input') {
      const t = (el.type || 'text').toLowerCase();
      if (t === 'checkbox') return 'checkbox';
      if (t === 'radio') return 'radio';
      if (t === 'range') return 'slider';
      if (t === 'search') return 'searchbox';
      if (t === 'button' || t === 'submit' || t === 'reset') return 'button';
      return 'textbox';
    }
    return IMPLICIT[tag] || '';
  };

  const accepted = (el, rect, style) => {
    if (rect.width < MIN || rect.height < MIN) return false;
    if (rect.x < 0 || rect.y < 0) return false;
    if (parseFloat(style.opacity) === 0) return false;
    if (style.display === 'none' || style.visibility === 'hidden') return false;

    // Clipped out of an ancestor's scroll/overflow region.
    let parent = el.parentElement;
    while (parent) {
      const ps = window.getComputedStyle(parent);
      if (ps.overflow === 'hidden' || ps.overflow === 'scroll' || ps.overflow === 'auto') {
        const pr = parent.getBoundingClientRect();
        if (rect.right < pr.left || rect.bottom < pr.top ||
            rect.left > pr.right || rect.top > pr.bottom) {
          return false;
        }
      }
      parent = parent.parentElement;
    }

    // Hit test at the center: the element or a descendant must be on top.
    const atPoint = document.elementFromPoint(
      rect.left + rect.width / 2, rect.top + rect.height / 2);
    if (!atPoint || (atPoint !== el && !el.contains(atPoint))) return false;

    const hasText = !!(el.textContent && el.textContent.trim().length > 0);
    const hasImage = el.tagName === 'IMG' || !!el.querySelector('img');
    const hasBackground = style.backgroundImage !== 'none' ||
      style.backgroundColor !== 'rgba(0, 0, 0, 0)';
    const hasInteractiveAttr = !!(el.getAttribute('onclick') ||
      el.getAttribute('href') || el.getAttribute('role') ||
      ['BUTTON','INPUT','A','SELECT','TEXTAREA'].includes(el.tagName));
    return hasText || hasImage || hasBackground || hasInteractiveAttr;
  };

  const out = [];
  for (const el of document.querySelectorAll('*')) {
    const role = roleOf(el);
    if (!ROLES.has(role)) continue;
    const rect = el.getBoundingClientRect();
    const style = window.getComputedStyle(el);
    if (!accepted(el, rect, style)) continue;

    const name = (el.getAttribute('aria-label') || el.textContent ||
      el.getAttribute('title') || el.getAttribute('placeholder') ||
      el.value || '').trim();

    out.push({
      role: role,
      name: name,
      x: Math.round(rect.x),
      y: Math.round(rect.y),
      width: Math.round(rect.width),
      height: Math.round(rect.height),
      tagName: el.tagName.toLowerCase(),
      id: el.id || '',
      className: (typeof el.className === 'string' ? el.className : '') || '',
      type: el.getAttribute('type') || '',
      href: el.getAttribute('href') || '',
      value: (typeof el.value === 'string' ? el.value : '') || '',
      disabled: !!el.disabled,
      checked: typeof el.checked === 'boolean' ? el.checked : null,
      selected: typeof el.selected === 'boolean' ? el.selected : null
    });
  }
  return out;
})()
"#;

/// One element as reported by the collection script.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawElement {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
    #[serde(default)]
    pub width: i32,
    #[serde(default)]
    pub height: i32,
    #[serde(default, rename = "tagName")]
    pub tag_name: String,
    #[serde(default)]
    pub id: String,
    #[serde(default, rename = "className")]
    pub class_name: String,
    #[serde(default, rename = "type")]
    pub input_type: String,
    #[serde(default)]
    pub href: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub checked: Option<bool>,
    #[serde(default)]
    pub selected: Option<bool>,
}
