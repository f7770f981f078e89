//! Element symbol lookup for trajectory output

/// Get the element symbol for an atomic number
///
/// Unknown atomic numbers map to "X" so that trajectory frames stay
/// parseable even for placeholder species.
pub fn symbol_for_z(z: u8) -> &'static str {
    match z {
        1 => "H",
        2 => "He",
        3 => "Li",
        4 => "Be",
        5 => "B",
        6 => "C",
        7 => "N",
        8 => "O",
        9 => "F",
        10 => "Ne",
        11 => "Na",
        12 => "Mg",
        13 => "Al",
        14 => "Si",
        15 => "P",
        16 => "S",
        17 => "Cl",
        18 => "Ar",
        19 => "K",
        20 => "Ca",
        26 => "Fe",
        29 => "Cu",
        30 => "Zn",
        34 => "Se",
        35 => "Br",
        53 => "I",
        _ => "X",
    }
}
