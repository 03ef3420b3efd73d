//! Human-readable names for key codes and mouse buttons.
//!
//! Key names follow the X11 keysym spelling for a US layout over the shared
//! evdev code space. Lookups by name are exact and case-sensitive.

use crate::event::MouseButton;

const KEY_NAMES: &[(u16, &str)] = &[
    (1, "Escape"),
    (2, "1"),
    (3, "2"),
    (4, "3"),
    (5, "4"),
    (6, "5"),
    (7, "6"),
    (8, "7"),
    (9, "8"),
    (10, "9"),
    (11, "0"),
    (12, "minus"),
    (13, "equal"),
    (14, "BackSpace"),
    (15, "Tab"),
    (16, "q"),
    (17, "w"),
    (18, "e"),
    (19, "r"),
    (20, "t"),
    (21, "y"),
    (22, "u"),
    (23, "i"),
    (24, "o"),
    (25, "p"),
    (26, "bracketleft"),
    (27, "bracketright"),
    (28, "Return"),
    (29, "Control_L"),
    (30, "a"),
    (31, "s"),
    (32, "d"),
    (33, "f"),
    (34, "g"),
    (35, "h"),
    (36, "j"),
    (37, "k"),
    (38, "l"),
    (39, "semicolon"),
    (40, "apostrophe"),
    (41, "grave"),
    (42, "Shift_L"),
    (43, "backslash"),
    (44, "z"),
    (45, "x"),
    (46, "c"),
    (47, "v"),
    (48, "b"),
    (49, "n"),
    (50, "m"),
    (51, "comma"),
    (52, "period"),
    (53, "slash"),
    (54, "Shift_R"),
    (55, "KP_Multiply"),
    (56, "Alt_L"),
    (57, "space"),
    (58, "Caps_Lock"),
    (59, "F1"),
    (60, "F2"),
    (61, "F3"),
    (62, "F4"),
    (63, "F5"),
    (64, "F6"),
    (65, "F7"),
    (66, "F8"),
    (67, "F9"),
    (68, "F10"),
    (69, "Num_Lock"),
    (70, "Scroll_Lock"),
    (71, "KP_7"),
    (72, "KP_8"),
    (73, "KP_9"),
    (74, "KP_Subtract"),
    (75, "KP_4"),
    (76, "KP_5"),
    (77, "KP_6"),
    (78, "KP_Add"),
    (79, "KP_1"),
    (80, "KP_2"),
    (81, "KP_3"),
    (82, "KP_0"),
    (83, "KP_Decimal"),
    (86, "less"),
    (87, "F11"),
    (88, "F12"),
    (96, "KP_Enter"),
    (97, "Control_R"),
    (98, "KP_Divide"),
    (99, "Print"),
    (100, "Alt_R"),
    (102, "Home"),
    (103, "Up"),
    (104, "Page_Up"),
    (105, "Left"),
    (106, "Right"),
    (107, "End"),
    (108, "Down"),
    (109, "Page_Down"),
    (110, "Insert"),
    (111, "Delete"),
    (119, "Pause"),
    (125, "Super_L"),
    (126, "Super_R"),
    (127, "Menu"),
];

const MOUSE_BUTTON_NAMES: [(MouseButton, &str); 12] = [
    (MouseButton::Left, "BUTTON_LEFT"),
    (MouseButton::Right, "BUTTON_RIGHT"),
    (MouseButton::Middle, "BUTTON_MIDDLE"),
    (MouseButton::WheelUp, "WHEEL_UP"),
    (MouseButton::WheelDown, "WHEEL_DOWN"),
    (MouseButton::WheelRight, "WHEEL_RIGHT"),
    (MouseButton::WheelLeft, "WHEEL_LEFT"),
    (MouseButton::X1, "BUTTON_BACK"),
    (MouseButton::X2, "BUTTON_FORWARD"),
    (MouseButton::X3, "BUTTON_8"),
    (MouseButton::X4, "BUTTON_9"),
    (MouseButton::X5, "BUTTON_10"),
];

pub fn key_name(keysym: u16) -> Option<&'static str> {
    KEY_NAMES
        .binary_search_by_key(&keysym, |&(code, _)| code)
        .ok()
        .map(|i| KEY_NAMES[i].1)
}

pub fn key_id(name: &str) -> Option<u16> {
    KEY_NAMES
        .iter()
        .find(|&&(_, n)| n == name)
        .map(|&(code, _)| code)
}

pub fn mouse_button_name(button: MouseButton) -> &'static str {
    MOUSE_BUTTON_NAMES[button.index() as usize].1
}

pub fn mouse_button_id(name: &str) -> Option<MouseButton> {
    MOUSE_BUTTON_NAMES
        .iter()
        .find(|&&(_, n)| n == name)
        .map(|&(button, _)| button)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::keysym;
    use proptest::prelude::*;

    #[test]
    fn key_table_is_sorted_and_unique() {
        assert!(KEY_NAMES.windows(2).all(|w| w[0].0 < w[1].0));
        for &(code, name) in KEY_NAMES {
            assert_eq!(key_id(name), Some(code), "{name}");
        }
    }

    #[test]
    fn well_known_keys() {
        assert_eq!(key_name(keysym::ESC), Some("Escape"));
        assert_eq!(key_name(keysym::A), Some("a"));
        assert_eq!(key_name(keysym::KP_ENTER), Some("KP_Enter"));
        assert_eq!(key_id("space"), Some(keysym::SPACE));
        assert_eq!(key_id("Space"), None);
        assert_eq!(key_name(0), None);
        assert_eq!(key_name(keysym::LIMIT), None);
    }

    #[test]
    fn mouse_buttons_by_name() {
        for index in 0..12 {
            let button = MouseButton::from_index(index).unwrap();
            assert_eq!(mouse_button_id(mouse_button_name(button)), Some(button));
        }
        assert_eq!(mouse_button_name(MouseButton::WheelUp), "WHEEL_UP");
        assert_eq!(mouse_button_id("BUTTON_BACK"), Some(MouseButton::X1));
        assert_eq!(mouse_button_id("button_left"), None);
    }

    proptest! {
        #[test]
        fn named_codes_resolve_back(code in 0u16..0x200) {
            if let Some(name) = key_name(code) {
                prop_assert_eq!(key_id(name), Some(code));
            }
        }
    }
}
