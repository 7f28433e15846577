//! Report fixtures for CLI tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};

fn show(x: i64, y: i64, text: &str) -> [Operation; 2] {
    [
        Operation::new(
            "Tm",
            [1, 0, 0, 1, x, y].into_iter().map(Object::Integer).collect(),
        ),
        Operation::new("Tj", vec![Object::string_literal(text)]),
    ]
}

/// Single page report with a title, the month and the basket table.
pub fn basket_report() -> Vec<u8> {
    let rows: [[&str; 3]; 4] = [
        ["Area", "Maize meal (kg)", "Rice (kg)"],
        ["Joburg", "R 54.99", "R 32.49"],
        ["Durban", "R 51.99", "-"],
        ["Cape Town", "R 59.99", "R 33,99"],
    ];

    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(10)]),
    ];
    operations.extend(show(72, 780, "Household Food Basket: Per area, compared"));
    operations.extend(show(72, 766, "May 2025"));
    for (r, row) in rows.iter().enumerate() {
        let y = 740 - r as i64 * 14;
        for (cell, x) in row.iter().zip([72, 200, 330]) {
            operations.extend(show(x, y, cell));
        }
    }
    operations.push(Operation::new("ET", vec![]));

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let content_id = doc.add_object(Stream::new(
        dictionary! {},
        Content { operations }.encode().unwrap(),
    ));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        },
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => Object::Integer(1),
            "MediaBox" => [0, 0, 595, 842].into_iter().map(Object::Integer).collect::<Vec<_>>(),
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

pub fn write_report(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, basket_report()).unwrap();
    path
}
