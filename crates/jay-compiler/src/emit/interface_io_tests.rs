//! Unit tests for interface file serialization.

use indoc::indoc;

use crate::emit::{read_class_interface, write_class_interface};
use crate::test_utils::compile_ok;

#[test]
fn interfaces_round_trip_through_their_files() {
    let class = compile_ok(indoc! {r#"
        class Counter {
            Int count = 0;
            Int add(Int amount) {
                count = count + amount;
                return count;
            }
            void reset() {
                count = 0;
            }
        }
    "#});
    let interface = class.interface();
    let text = write_class_interface(&interface);
    let read_back = read_class_interface(&text).unwrap();
    assert_eq!(read_back, interface);
}

#[test]
fn the_file_format_is_pretty_json_with_code_string_types() {
    let class = compile_ok(indoc! {r#"
        class Point {
            Int[] coords;
            void scale(Double factor) { }
        }
    "#});
    let text = write_class_interface(&class.interface());
    assert!(text.contains("\"identifier\": \"Point\""));
    assert!(text.contains("\"type\": \"Int[]\""));
    assert!(text.contains("\"returnType\": \"void\""));
    assert!(text.contains("\"argTypes\": [\n"));
    assert!(text.ends_with("}\n"));
}

#[test]
fn reading_rejects_trailing_garbage_and_malformed_input() {
    let class = compile_ok("class C { void m() { } }");
    let mut text = write_class_interface(&class.interface());
    assert!(read_class_interface(&text).is_ok());
    text.push_str("trailing");
    assert!(read_class_interface(&text).is_err());

    assert!(read_class_interface("not json").is_err());
    assert!(read_class_interface("{}").is_err());
}
