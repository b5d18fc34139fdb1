//! Dump-level tests for the frontend interface
//!
//! These mirror what a frontend emits for typical HAL sources.

use super::*;
use crate::ast::{DeclRef, TypeRef, VarScope};
use halscan_core::{Origin, RawLoc};

const UART_DUMP: &str = r#"{
  "unit": {
    "main_file": "Src/uart.c",
    "decls": [
      {"kind": "enum", "id": 1, "name": "HAL_StatusTypeDef", "constants": [
        {"id": 10, "name": "HAL_OK", "value": 0},
        {"id": 11, "name": "HAL_ERROR", "value": 1}
      ]},
      {"kind": "function", "name": "UART_Wait", "return_type": {"other": "int"},
       "origin": "main_file",
       "body": {"kind": "compound", "stmts": [
         {"kind": "decl", "decls": [
           {"kind": "var", "id": 5, "name": "st", "is_local": true,
            "init": {"style": "c", "expr": {"kind": "ref", "target":
              {"kind": "enum_constant", "id": 10, "name": "HAL_OK"}}}}
         ]},
         {"kind": "while", "header": {"begin": 100, "end": 104},
          "cond": {"kind": "int_literal", "value": 1},
          "body": {"kind": "break"}},
         {"kind": "return", "value": {"kind": "ref", "target":
           {"kind": "var", "id": 5, "name": "st", "scope": "local"}}}
       ]}}
    ]
  },
  "macros": [
    {"name": "USART1", "replacement": ["(", "(", "USART_TypeDef", "*", ")", "USART1_BASE", ")"]}
  ],
  "locations": [
    {"loc": 100, "file": "Src/uart.c", "line": 12, "column": 5},
    {"loc": 104, "file": "Src/uart.c", "line": 12, "column": 12}
  ]
}"#;

#[test]
fn test_load_uart_dump() {
    let dump = TuDump::from_json(UART_DUMP).unwrap();

    assert_eq!(dump.unit.main_file, "Src/uart.c");
    assert_eq!(dump.unit.decls.len(), 2);
    assert_eq!(dump.macros.len(), 1);
    assert_eq!(dump.macros[0].params, 0);
    assert_eq!(dump.macros[0].replacement[5].kind, TokenKind::Identifier);
    assert_eq!(dump.locations.presumed_loc(RawLoc(104)).unwrap().column, 12);

    let Decl::Function(func) = &dump.unit.decls[1] else {
        panic!("expected a function");
    };
    assert_eq!(func.origin, Origin::MainFile);
    assert_eq!(func.return_type, TypeRef::Other("int".into()));

    let Some(Stmt::Compound { stmts }) = &func.body else {
        panic!("expected a compound body");
    };
    let Stmt::Return { value: Some(ret) } = &stmts[2] else {
        panic!("expected a return");
    };
    assert!(matches!(
        ret.referenced_decl(),
        Some(DeclRef::Var { scope: VarScope::Local, .. })
    ));
}

#[test]
fn test_dump_rejects_garbage() {
    assert!(TuDump::from_json("{\"unit\": 3}").is_err());
}

#[test]
fn test_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("uart.json");
    std::fs::write(&path, UART_DUMP).unwrap();

    let dump = TuDump::load(&path).unwrap();
    assert_eq!(dump.locations.len(), 2);
}
