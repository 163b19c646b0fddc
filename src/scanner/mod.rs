//! Turns annotated sources into declaration fragments.

mod annotations;
pub mod enums;

use crate::error::ScanError;
use crate::model::{Accumulators, Dialect, FileFragments};
use annotations::Scanner;

/// Scan one file's text.
///
/// Per-file fragments are returned; main page and enum text is appended to
/// `acc`. Any comment region or enum table still open at the end of the text
/// is closed before returning.
pub fn scan(input: &str, dialect: Dialect, acc: &mut Accumulators) -> Result<FileFragments, ScanError> {
    let mut scanner = Scanner::new(dialect, acc);
    for (idx, line) in input.lines().enumerate() {
        scanner.line(idx + 1, line)?;
    }
    Ok(scanner.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FUNCS_HEADER_MARKER;

    fn scan_cpp(input: &str) -> (FileFragments, Accumulators) {
        let mut acc = Accumulators::default();
        let frags = scan(input, Dialect::Block, &mut acc).unwrap();
        (frags, acc)
    }

    #[test]
    fn register_class_opens_class() {
        let (frags, _) = scan_cpp("REGISTER_LUA_CLASS(Foo);\n");
        assert!(frags.classes["Foo"].header.starts_with("class Foo {"));
    }

    #[test]
    fn register_subclass_declares_parent() {
        let (frags, _) = scan_cpp("REGISTER_LUA_SUBCLASS( Ship, MoveObject );\n");
        let header = &frags.classes["Ship"].header;
        assert!(header.starts_with("class Ship"));
        assert!(header.contains(": public MoveObject"));
    }

    #[test]
    fn luafunc_after_registration() {
        let input = "REGISTER_LUA_CLASS(Foo);\n\
                     /**\n\
                     \x20* @luafunc static int Foo::bar(int x)\n\
                     \x20*/\n";
        let (frags, _) = scan_cpp(input);
        let foo = &frags.classes["Foo"];
        assert_eq!(foo.header.matches("class Foo {").count(), 1);
        assert_eq!(foo.body.len(), 1);
        assert!(foo.body[0].starts_with("static int bar(int x)"));
        assert!(frags.comments.contains(&" \\fn int Foo::bar(int x)\n".to_string()));
    }

    #[test]
    fn registration_after_members_keeps_header_first() {
        let input = "/**\n * @luafunc Foo::bar()\n */\nREGISTER_LUA_CLASS(Foo);\n";
        let (frags, _) = scan_cpp(input);
        let foo = &frags.classes["Foo"];
        assert!(foo.header.starts_with("class Foo {"));
        assert!(foo.body[0].starts_with("void bar()"));
    }

    #[test]
    fn method_table_generates_stubs() {
        let input = r#"
#define LUA_METHODS(CLASS, METHOD) \
   METHOD(CLASS, getLoc,   ARRAYDEF({{ END }}), 1 ) \
   METHOD(CLASS, setLoc,   ARRAYDEF({{ PT, END }}), 1 ) \

GENERATE_LUA_METHODS_TABLE(BfObject, LUA_METHODS);
"#;
        let (frags, _) = scan_cpp(input);
        assert_eq!(
            frags.classes["BfObject"].body,
            vec!["void getLoc() { }\n".to_string(), "void setLoc() { }\n".to_string()]
        );
    }

    #[test]
    fn luafunc_supersedes_table_stub() {
        let input = r#"
#define LUA_METHODS(CLASS, METHOD) \
   METHOD(CLASS, getLoc,   ARRAYDEF({{ END }}), 1 ) \
   METHOD(CLASS, setLoc,   ARRAYDEF({{ PT, END }}), 1 ) \

GENERATE_LUA_METHODS_TABLE(BfObject, LUA_METHODS);

/**
 * @luafunc point BfObject::getLoc()
 * Returns the object's location.
 */
"#;
        let (frags, _) = scan_cpp(input);
        let body = &frags.classes["BfObject"].body;
        assert_eq!(body.len(), 2);
        assert_eq!(body[0], "void setLoc() { }\n");
        assert!(body[1].starts_with("point getLoc()"));
        assert!(frags.comments.contains(&" * Returns the object's location.\n".to_string()));
    }

    #[test]
    fn static_table_skips_documented_methods() {
        let input = r#"
/**
 * @luafunc static num Geom::area(poly p)
 */
#define LUA_STATIC_METHODS(METHOD) \
   METHOD(area,      ARRAYDEF({{ TABLE, END }}), 1 ) \
   METHOD(centroid,  ARRAYDEF({{ TABLE, END }}), 1 ) \

GENERATE_LUA_STATIC_METHODS_TABLE(Geom, LUA_STATIC_METHODS);
"#;
        let (frags, _) = scan_cpp(input);
        let geom = &frags.classes["Geom"];
        assert!(geom.header.starts_with("class Geom {"));
        assert_eq!(geom.body.len(), 2);
        assert!(geom.body[0].starts_with("static num area(poly p)"));
        assert_eq!(geom.body[1], "static void centroid() { }\n");
    }

    #[test]
    fn constructor_gets_example() {
        let input = "/**\n * @luafunc Ship::Ship(point pos)\n */\n";
        let (frags, _) = scan_cpp(input);
        assert!(frags.comments.iter().any(|c| c.contains("Ship.new(point pos)")));
    }

    #[test]
    fn luafunc_without_class_is_global() {
        let input = "/**\n * @luafunc num getMachineTime()\n */\n";
        let (frags, _) = scan_cpp(input);
        assert!(frags.classes.is_empty());
        assert_eq!(frags.global_functions.len(), 1);
        assert!(frags.global_functions[0].starts_with("num getMachineTime()"));
        assert!(frags.comments.contains(&" \\fn num global::getMachineTime()\n".to_string()));
    }

    #[test]
    fn luafunc_without_method_is_fatal() {
        let mut acc = Accumulators::default();
        let err = scan("/**\n * @luafunc broken\n */\n", Dialect::Block, &mut acc).unwrap_err();
        assert!(matches!(err, ScanError::MissingMethodName { line: 2, .. }));
    }

    #[test]
    fn text_before_first_tag_is_dropped() {
        let input = "/**\n * Some ordinary comment\n * @descr Lua-facing text\n * More text\n */\n";
        let (frags, _) = scan_cpp(input);
        assert_eq!(
            frags.comments,
            vec![
                "/*!\n".to_string(),
                "\n Lua-facing text\n".to_string(),
                " * More text\n".to_string(),
                "*/\n".to_string(),
            ]
        );
    }

    #[test]
    fn par_marks_comment_without_output() {
        let input = "/**\n * \\par Example\n * text\n */\n";
        let (frags, _) = scan_cpp(input);
        assert_eq!(frags.comments, vec!["/*!\n", " * text\n", "*/\n"]);
    }

    #[test]
    fn geometry_becomes_paragraph() {
        let input = "/**\n * @luaclass Ship\n * @geom The geometry of a ship is a point\n */\n";
        let (frags, _) = scan_cpp(input);
        assert!(frags.comments.contains(&" \\class Ship\n".to_string()));
        assert!(frags
            .comments
            .contains(&"\\par Geometry\nThe geometry of a ship is a point\n".to_string()));
    }

    #[test]
    fn single_line_comment_is_ignored() {
        let input = "typedef struct   /**** BMP file header ****/\n{\n   unsigned short bfType;\n} BMPHeader;\n";
        let (frags, _) = scan_cpp(input);
        assert!(frags.is_empty());
    }

    #[test]
    fn mainpage_goes_to_accumulator() {
        let input = "/**\n * @mainpage Welcome\n * Intro text\n */\n";
        let (frags, acc) = scan_cpp(input);
        assert_eq!(acc.mainpage, vec![" * @mainpage Welcome\n", " * Intro text\n"]);
        assert_eq!(frags.comments, vec!["/*!\n", "*/\n"]);
    }

    #[test]
    fn funcs_header_injects_marker() {
        let input = "/**\n * @luafuncsheader Ship\n * Ships are what you fly.\n */\n";
        let (frags, _) = scan_cpp(input);
        assert_eq!(
            frags.classes["Ship"].body,
            vec![format!("void {}() {{ }}\n", FUNCS_HEADER_MARKER)]
        );
        assert!(frags
            .comments
            .contains(&format!("\\fn Ship::{}\n", FUNCS_HEADER_MARKER)));
        assert!(frags.comments.contains(&" * Ships are what you fly.\n".to_string()));
    }

    #[test]
    fn enum_state_survives_comment_close() {
        let input = r#"/**
 * @luaenum Weapon(2)
 * The Weapon enum represents weapons.
 */

#define WEAPON_ITEM_TABLE \
  WEAPON_ITEM(WeaponPhaser, "Phaser",  "Phaser",  100 ) \
  WEAPON_ITEM(WeaponBounce, "Bouncer", "Bouncer", 100 ) \

int afterwards = 0;
"#;
        let (_, acc) = scan_cpp(input);
        assert_eq!(
            acc.enums,
            vec![
                "/**\n  * @defgroup WeaponEnum Weapon\n",
                " * The Weapon enum represents weapons.\n",
                "@{\n",
                "# Weapon\n",
                " * * %Weapon.%Phaser <br>\n",
                " * * %Weapon.%Bouncer <br>\n",
                "@}\n",
                "*/\n\n",
            ]
        );
    }

    #[test]
    fn method_table_between_enum_comment_and_its_table() {
        let input = r#"/**
 * @luaenum Team(1)
 * Teams.
 */

#define LUA_METHODS(CLASS, METHOD) \
   METHOD(CLASS, getTeam, ARRAYDEF({{ END }}), 1 ) \

GENERATE_LUA_METHODS_TABLE(Ship, LUA_METHODS);

#define TEAM_TABLE \
  TEAM(TeamNeutral, "Neutral") \

"#;
        let (frags, acc) = scan_cpp(input);
        assert_eq!(frags.classes["Ship"].body, vec!["void getTeam() { }\n".to_string()]);
        assert!(acc.enums.iter().all(|line| !line.contains("getTeam")));
        assert!(acc.enums.contains(&" * * %Team.%Neutral <br>\n".to_string()));
        assert_eq!(acc.enums.last().map(String::as_str), Some("*/\n\n"));
    }

    #[test]
    fn enum_include_flag_filters_rows() {
        let input = r#"/**
 * @luaenum ObjType(1, 1, 2)
 */
#define TYPE_NUMBER_TABLE \
  TYPE_NUMBER(UnknownType, "Unknown", false ) \
  TYPE_NUMBER(ShipType,    "Ship",    true  ) \
  TYPE_NUMBER(TurretType,  "Turret",  1     )
"#;
        let (_, acc) = scan_cpp(input);
        let rows: Vec<_> = acc.enums.iter().filter(|l| l.starts_with(" * * ")).collect();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].contains("%ObjType.%Ship"));
        assert!(rows[1].contains("%ObjType.%Turret"));
        assert_eq!(acc.enums.last().map(String::as_str), Some("*/\n\n"));
    }

    #[test]
    fn accumulators_span_files() {
        let mut acc = Accumulators::default();
        scan("/**\n * @page one\n * first\n */\n", Dialect::Plain, &mut acc).unwrap();
        scan("/**\n * @page two\n * second\n */\n", Dialect::Plain, &mut acc).unwrap();
        assert_eq!(acc.mainpage.len(), 4);
        assert!(acc.mainpage[0].contains("@page one"));
        assert!(acc.mainpage[3].contains("second"));
    }

    #[test]
    fn unclosed_enum_table_is_closed_at_end_of_file() {
        let mut acc = Accumulators::default();
        let first = "/**\n * @luaenum Team(1)\n */\n#define TEAM_TABLE \\\n  TEAM(Blue, \"Blue\") \\\n";
        scan(first, Dialect::Block, &mut acc).unwrap();
        assert_eq!(acc.enums.last().map(String::as_str), Some("*/\n\n"));

        // The next file's text must not land inside the previous group
        scan("/**\n * @mainpage Hi\n */\n", Dialect::Block, &mut acc).unwrap();
        assert!(!acc.enums.iter().any(|l| l.contains("Hi")));
    }

    #[test]
    fn unclosed_comment_is_closed_at_end_of_file() {
        let (frags, _) = scan_cpp("/**\n * @luaclass Ship\n * trailing\n");
        assert_eq!(frags.comments.last().map(String::as_str), Some("*/\n"));
    }

    #[test]
    fn lua_dialect() {
        let input = "--[[\n@luaclass LuaLevelGenerator\n@luafunc LuaLevelGenerator:addWall(num width, table geom)\n--]]\n";
        let mut acc = Accumulators::default();
        let frags = scan(input, Dialect::Bracketed, &mut acc).unwrap();
        let class = &frags.classes["LuaLevelGenerator"];
        assert!(class.header.starts_with("class LuaLevelGenerator {"));
        assert!(class.body[0].starts_with("void addWall(num width, table geom)"));
        assert_eq!(frags.comments[0], "/*!\n");
        assert!(frags.comments.contains(&" \\class LuaLevelGenerator\n".to_string()));
    }

    #[test]
    fn scanning_is_deterministic() {
        let input = "REGISTER_LUA_CLASS(B);\nREGISTER_LUA_CLASS(A);\n/**\n * @luafunc A::x()\n * @luafunc B::y()\n */\n";
        let (first, _) = scan_cpp(input);
        let (second, _) = scan_cpp(input);
        assert_eq!(first, second);
        let order: Vec<_> = first.classes.keys().cloned().collect();
        assert_eq!(order, vec!["B", "A"]);
    }
}
