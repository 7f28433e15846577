//! PDF fixtures built in memory with lopdf.

#![allow(dead_code)]

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};

pub const FONT_SIZE: i64 = 10;
pub const ROW_HEIGHT: i64 = 14;

/// Text placed at an absolute position.
#[derive(Debug, Clone)]
pub struct Placed {
    pub x: i64,
    pub y: i64,
    pub text: String,
}

pub fn text(x: i64, y: i64, text: &str) -> Placed {
    Placed {
        x,
        y,
        text: text.to_string(),
    }
}

/// Lay out `rows` as a grid starting at baseline `top`. Empty cells are not drawn.
pub fn grid(top: i64, columns: &[i64], rows: &[&[&str]]) -> Vec<Placed> {
    let mut placed = Vec::new();
    for (r, row) in rows.iter().enumerate() {
        let y = top - r as i64 * ROW_HEIGHT;
        for (cell, x) in row.iter().zip(columns) {
            if !cell.is_empty() {
                placed.push(text(*x, y, cell));
            }
        }
    }
    placed
}

/// Content stream operations drawing each item with Helvetica at 10pt.
pub fn text_operations(items: &[Placed]) -> Vec<Operation> {
    let mut ops = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(FONT_SIZE)]),
    ];
    for item in items {
        ops.push(Operation::new(
            "Tm",
            vec![
                Object::Integer(1),
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(1),
                Object::Integer(item.x),
                Object::Integer(item.y),
            ],
        ));
        ops.push(Operation::new("Tj", vec![Object::string_literal(item.text.as_str())]));
    }
    ops.push(Operation::new("ET", vec![]));
    ops
}

/// Operations that stroke a line and draw no text.
pub fn drawing_operations() -> Vec<Operation> {
    vec![
        Operation::new("m", vec![Object::Integer(72), Object::Integer(700)]),
        Operation::new("l", vec![Object::Integer(500), Object::Integer(700)]),
        Operation::new("S", vec![]),
    ]
}

/// Build a document with one page per operation list.
///
/// Font resources live on the page tree root and are inherited by every page.
pub fn build_pdf(pages: Vec<Vec<Operation>>) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids = Vec::new();
    for operations in pages {
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    let pages_dict = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => Object::Integer(count),
        "Resources" => resources_id,
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(595),
            Object::Integer(842),
        ],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

pub const MAIZE_X: i64 = 200;
pub const RICE_X: i64 = 330;

/// Three-page report: a contents table, the basket table, a notes table.
///
/// Each region row carries one price; the other cell is a dash.
pub fn monthly_report(region_header: &str) -> Vec<u8> {
    let columns = [72, MAIZE_X, RICE_X];

    let mut page1 = vec![text(72, 780, "Household Affordability Index")];
    page1.extend(grid(
        750,
        &[72, 200],
        &[&["Page", "Topic"], &["1", "Overview"], &["2", "Food basket"], &["3", "Notes"]],
    ));

    let mut page2 = vec![
        text(72, 780, "Household Food Basket: Per area, compared"),
        text(72, 766, "May 2025"),
    ];
    page2.extend(grid(
        740,
        &columns,
        &[
            &[region_header, "Maize meal (kg)", "Rice (kg)"],
            &["Joburg", "R 54.99", "-"],
            &["Durban", "-", "R 31,49"],
            &["Cape Town", "R 59.99", "-"],
            &["Springbok", "-", "R 36.00"],
            &["Maritzburg", "R 52.49", "-"],
        ],
    ));
    page2.push(text(72, 740 - 6 * ROW_HEIGHT, "Source: PMBEJD"));

    let page3 = grid(
        780,
        &[72, 200],
        &[&["Source:", "PMBEJD"], &["Note:", "Prices include VAT"]],
    );

    build_pdf(vec![
        text_operations(&page1),
        text_operations(&page2),
        text_operations(&page3),
    ])
}

/// Column x positions of the per-area table in [`publisher_report`].
pub const PER_AREA_COLUMNS: [i64; 7] = [40, 120, 185, 260, 335, 410, 485];

/// Food rows of the per-area table: item, quantity, then one price per column.
pub const PER_AREA_ROWS: &[&[&str]] = &[
    &["Maize meal", "10kg", "R 82,99", "R 79,99", "R 84,99", "R 89,99", "R 84,49"],
    &["Rice", "10kg", "R 159,99", "R 149,99", "R 162,99", "R 169,99", "R 160,74"],
    &["Cake flour", "10kg", "R 104,99", "R 99,99", "R 109,99", "R 114,99", "R 107,49"],
    &["White sugar", "10kg", "R 189,99", "R 184,99", "R 194,99", "R 199,99", "R 192,49"],
    &["Cooking oil", "5L", "R 139,99", "R 134,99", "R 144,99", "R 149,99", "R 142,49"],
    &["Eggs", "60", "R 124,99", "R 119,99", "R 129,99", "R 134,99", "R 127,49"],
];

/// Three-page report laid out like the published index.
///
/// Page 1 holds a national summary with the same foods, page 2 the per-area
/// table whose header wraps onto a second, tighter baseline, page 3 notes.
pub fn publisher_report() -> Vec<u8> {
    let mut page1 = vec![text(40, 780, "7. MAY 2025 Household Food Basket: National")];
    page1.extend(grid(
        740,
        &[40, 120, 220, 300],
        &[
            &["Foods tracked", "Quantity tracked", "South Africa", "Change"],
            &["Maize meal", "10kg", "R 84,49", "R 1,50"],
            &["Rice", "10kg", "R 160,74", "R 2,00"],
            &["Cake flour", "10kg", "R 107,49", "-R 0,50"],
            &["White sugar", "10kg", "R 192,49", "R 3,00"],
            &["Cooking oil", "5L", "R 142,49", "R 0,00"],
            &["Eggs", "60", "R 127,49", "R 4,00"],
        ],
    ));

    let c = PER_AREA_COLUMNS;
    let mut page2 = vec![
        text(40, 780, "8. MAY 2025 Household Food Basket: Per area, compared"),
        text(c[0], 740, "Foods"),
        text(c[1], 740, "Quantity"),
        text(c[2], 740, "Joburg"),
        text(c[3], 740, "Durban"),
        text(c[4], 740, "Cape Town"),
        text(c[5], 740, "Springbok"),
        text(c[6], 740, "Averag"),
        text(c[0], 730, "tracked"),
        text(c[1], 730, "tracked"),
        text(c[6], 730, "e"),
    ];
    for (r, row) in PER_AREA_ROWS.iter().enumerate() {
        let y = 714 - r as i64 * 16;
        page2.extend(row.iter().zip(c).map(|(cell, x)| text(x, y, cell)));
    }

    let page3 = grid(
        780,
        &[40, 185],
        &[&["Source:", "PMBEJD"], &["Note:", "Prices include VAT"]],
    );

    build_pdf(vec![
        text_operations(&page1),
        text_operations(&page2),
        text_operations(&page3),
    ])
}
