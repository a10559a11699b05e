use object::{Object, ObjectSymbol, SymbolKind};

use mscan::domain::Pc;
use mscan::symbolization::{ChainResolver, SymbolResolver, SymbolTable, Symbolizer};

const BIN: &str = env!("CARGO_BIN_EXE_mscan");

/// Address of the first text symbol whose demangled name contains `needle`
fn function_address(needle: &str) -> Option<u64> {
    let data = std::fs::read(BIN).ok()?;
    let file = object::File::parse(&*data).ok()?;
    file.symbols()
        .filter(|s| s.kind() == SymbolKind::Text && s.address() != 0)
        .find(|s| {
            s.name()
                .is_ok_and(|n| format!("{:#}", rustc_demangle::demangle(n)).contains(needle))
        })
        .map(|s| s.address())
}

#[test]
fn test_symbolizer_creation() {
    let symbolizer = Symbolizer::new(BIN);
    assert!(symbolizer.is_ok(), "Failed to create symbolizer: {:?}", symbolizer.err());
}

#[test]
fn test_symbolizer_missing_binary() {
    let err = Symbolizer::new("/nonexistent/vmlinux").err().unwrap();
    assert!(err.to_string().contains("/nonexistent/vmlinux"));
}

#[test]
fn test_symbolizer_resolves_function_names() {
    let symbolizer = Symbolizer::new(BIN).unwrap();
    let addr = function_address("mscan::run").expect("mscan::run not in symbol table");

    let line = SymbolResolver::resolve(&symbolizer, Pc(addr)).expect("no DWARF for mscan::run");
    assert!(line.function.contains("run"), "resolved to {line}");
    assert!(line.file.is_some_and(|f| f.ends_with("main.rs")));

    // Cached result is identical
    let again = symbolizer.resolve(addr);
    assert_eq!(again.frames.len(), symbolizer.resolve(addr).frames.len());
}

#[test]
fn test_unknown_pc_falls_back_to_table() {
    let symbolizer = Symbolizer::new(BIN).unwrap();
    let table = SymbolTable::parse("ffffffff81000000 T _stext\nffffffff81000400 T sys_open\n");
    let chain = ChainResolver::new(symbolizer, table);

    let line = chain.resolve(Pc(0xffff_ffff_8100_0420)).unwrap();
    assert_eq!(line.function, "sys_open");
    assert_eq!(line.file, None);
    assert_eq!(chain.resolve(Pc(0x10)), None);
}
