//! Base colors to pick from. Metallic and roughness vary per object instead.

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Material {
    pub name: &'static str,
    pub color: [f32; 3],
}

const fn material(name: &'static str, r: f32, g: f32, b: f32) -> Material {
    Material {
        name,
        color: [r, g, b],
    }
}

/// Measured metal albedos followed by flat test colors.
pub const MATERIALS: [Material; 12] = [
    material("Gold", 1.000000, 0.765557, 0.336057),
    material("Copper", 0.955008, 0.637427, 0.538163),
    material("Chromium", 0.549585, 0.556114, 0.554256),
    material("Nickel", 0.659777, 0.608679, 0.525649),
    material("Titanium", 0.541931, 0.496791, 0.449419),
    material("Cobalt", 0.662124, 0.654864, 0.633732),
    material("Platinum", 0.672411, 0.637331, 0.585456),
    material("White", 1.0, 1.0, 1.0),
    material("Dark", 0.1, 0.1, 0.1),
    material("Black", 0.0, 0.0, 0.0),
    material("Red", 1.0, 0.0, 0.0),
    material("Blue", 0.0, 0.0, 1.0),
];

pub const DEFAULT_MATERIAL: usize = 9;

/// Steps `index` by `delta` through the table, wrapping at both ends.
pub fn cycle(index: usize, delta: isize, len: usize) -> usize {
    (index as isize + delta).rem_euclid(len as isize) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_material_is_black() {
        assert_eq!(MATERIALS[DEFAULT_MATERIAL].name, "Black");
        assert_eq!(MATERIALS[DEFAULT_MATERIAL].color, [0.0; 3]);
    }

    #[test]
    fn cycling_wraps_both_ways() {
        assert_eq!(cycle(11, 1, MATERIALS.len()), 0);
        assert_eq!(cycle(0, -1, MATERIALS.len()), 11);
        assert_eq!(cycle(DEFAULT_MATERIAL, 1, MATERIALS.len()), 10);
    }

    #[test]
    fn names_are_unique() {
        for (i, m) in MATERIALS.iter().enumerate() {
            assert!(MATERIALS[i + 1..].iter().all(|o| o.name != m.name));
        }
    }
}
