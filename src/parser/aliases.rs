//! Static alias tables for chain and token canonicalization.
//!
//! Lookup data only. The parser decides whether an ambiguous alias like
//! "eth" means the chain or the token from surrounding context.

/// Chain aliases with their canonical name and chain id
pub const CHAIN_ALIASES: &[(&str, &str, u64)] = &[
    ("ethereum", "Ethereum", 1),
    ("mainnet", "Ethereum", 1),
    ("eth", "Ethereum", 1),
    ("base", "Base", 8453),
    ("polygon", "Polygon", 137),
    ("matic", "Polygon", 137),
    ("arbitrum", "Arbitrum", 42161),
    ("arb", "Arbitrum", 42161),
    ("optimism", "Optimism", 10),
    ("op", "Optimism", 10),
    // Non-EVM privacy target; flow steps always execute on the source chain
    ("zcash", "Zcash", 0),
];

/// Canonical name of the privacy bridging destination
pub const PRIVACY_CHAIN: &str = "Zcash";

/// Token aliases to canonical symbol. Two-word aliases are matched before
/// single words by the parser.
pub const TOKEN_ALIASES: &[(&str, &str)] = &[
    ("usdc", "USDC"),
    ("usd coin", "USDC"),
    ("usdt", "USDT"),
    ("tether", "USDT"),
    ("dai", "DAI"),
    ("eth", "ETH"),
    ("ether", "ETH"),
    ("weth", "WETH"),
    ("wbtc", "WBTC"),
    ("btc", "WBTC"),
    ("matic", "MATIC"),
    ("op", "OP"),
    ("arb", "ARB"),
    ("zec", "ZEC"),
];

/// Decimals per canonical symbol (18 when absent)
pub const TOKEN_DECIMALS: &[(&str, u32)] = &[
    ("USDC", 6),
    ("USDT", 6),
    ("DAI", 18),
    ("ETH", 18),
    ("WETH", 18),
    ("WBTC", 8),
    ("MATIC", 18),
    ("OP", 18),
    ("ARB", 18),
    ("ZEC", 8),
];

/// Resolve a chain alias to its canonical (name, chain id)
pub fn resolve_chain(alias: &str) -> Option<(&'static str, u64)> {
    let alias = alias.to_lowercase();
    CHAIN_ALIASES
        .iter()
        .find(|(a, _, _)| *a == alias)
        .map(|(_, name, id)| (*name, *id))
}

/// Canonical chain name for a chain id
pub fn chain_name(chain_id: u64) -> Option<&'static str> {
    CHAIN_ALIASES
        .iter()
        .find(|(_, _, id)| *id == chain_id)
        .map(|(_, name, _)| *name)
}

/// Chain id for a canonical chain name
pub fn chain_id_for_name(name: &str) -> Option<u64> {
    let name = name.to_lowercase();
    CHAIN_ALIASES
        .iter()
        .find(|(_, n, _)| n.to_lowercase() == name)
        .map(|(_, _, id)| *id)
}

/// Resolve a token alias to its canonical symbol
pub fn resolve_token(alias: &str) -> Option<&'static str> {
    let alias = alias.to_lowercase();
    TOKEN_ALIASES
        .iter()
        .find(|(a, _)| *a == alias)
        .map(|(_, sym)| *sym)
}

/// Decimals for a canonical token symbol
pub fn token_decimals(symbol: &str) -> u32 {
    TOKEN_DECIMALS
        .iter()
        .find(|(s, _)| *s == symbol)
        .map(|(_, d)| *d)
        .unwrap_or(18)
}
