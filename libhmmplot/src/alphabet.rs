/// Amino acid display symbols, in HMMER3 emission column order.
pub const AMINO_ALPHABET: [&str; 20] = [
    "A", "C", "D", "E", "F", "G", "H", "I", "K", "L", "M", "N", "P", "Q", "R", "S", "T", "V", "W",
    "Y",
];

/// Nucleotide display symbols, in HMMER3 emission column order.
pub const DNA_ALPHABET: [&str; 4] = ["A", "C", "G", "T"];
