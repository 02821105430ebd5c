//! Hand-built descriptor sets used across the integration tests.
//!
//! Building the `FileDescriptorProto`s in code keeps the tests independent from `protoc`.
#![allow(dead_code)]

use prost_reflect::DescriptorPool;
use prost_types::{
    DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
    FileDescriptorProto, FileDescriptorSet, MessageOptions, MethodDescriptorProto,
    ServiceDescriptorProto,
    field_descriptor_proto::{Label, Type},
};

/// Fully qualified reference to `name` inside `package`, as stored in descriptors.
pub fn qualify(package: &str, name: &str) -> String {
    if package.is_empty() {
        format!(".{name}")
    } else {
        format!(".{package}.{name}")
    }
}

pub fn file(
    name: &str,
    package: &str,
    dependencies: &[&str],
    messages: Vec<DescriptorProto>,
    enums: Vec<EnumDescriptorProto>,
    services: Vec<ServiceDescriptorProto>,
) -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some(name.to_string()),
        package: (!package.is_empty()).then(|| package.to_string()),
        dependency: dependencies.iter().map(|d| d.to_string()).collect(),
        message_type: messages,
        enum_type: enums,
        service: services,
        syntax: Some("proto3".to_string()),
        ..Default::default()
    }
}

pub fn message(name: &str, fields: Vec<FieldDescriptorProto>) -> DescriptorProto {
    DescriptorProto {
        name: Some(name.to_string()),
        field: fields,
        ..Default::default()
    }
}

pub fn scalar(name: &str, number: i32, r#type: Type) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(Label::Optional as i32),
        r#type: Some(r#type as i32),
        ..Default::default()
    }
}

pub fn message_field(name: &str, number: i32, type_name: &str) -> FieldDescriptorProto {
    FieldDescriptorProto {
        type_name: Some(type_name.to_string()),
        ..scalar(name, number, Type::Message)
    }
}

pub fn enum_field(name: &str, number: i32, type_name: &str) -> FieldDescriptorProto {
    FieldDescriptorProto {
        type_name: Some(type_name.to_string()),
        ..scalar(name, number, Type::Enum)
    }
}

pub fn repeated(field: FieldDescriptorProto) -> FieldDescriptorProto {
    FieldDescriptorProto {
        label: Some(Label::Repeated as i32),
        ..field
    }
}

/// Adds a `map<key, value>` field to `message`, together with its synthetic entry type.
///
/// `scope` is the fully qualified name of `message` (e.g. `.inventory.Item`).
pub fn add_map_field(
    message: &mut DescriptorProto,
    scope: &str,
    name: &str,
    number: i32,
    key: FieldDescriptorProto,
    value: FieldDescriptorProto,
) {
    let entry_name = format!("{}Entry", camel_case(name));

    message.nested_type.push(DescriptorProto {
        name: Some(entry_name.clone()),
        field: vec![
            FieldDescriptorProto {
                name: Some("key".to_string()),
                number: Some(1),
                ..key
            },
            FieldDescriptorProto {
                name: Some("value".to_string()),
                number: Some(2),
                ..value
            },
        ],
        options: Some(MessageOptions {
            map_entry: Some(true),
            ..Default::default()
        }),
        ..Default::default()
    });

    message.field.push(repeated(message_field(
        name,
        number,
        &format!("{scope}.{entry_name}"),
    )));
}

pub fn enumeration(name: &str, values: &[&str]) -> EnumDescriptorProto {
    EnumDescriptorProto {
        name: Some(name.to_string()),
        value: values
            .iter()
            .enumerate()
            .map(|(number, value)| EnumValueDescriptorProto {
                name: Some(value.to_string()),
                number: Some(number as i32),
                ..Default::default()
            })
            .collect(),
        ..Default::default()
    }
}

/// A service whose methods are given as `(name, input type, output type)`.
pub fn service(name: &str, methods: &[(&str, &str, &str)]) -> ServiceDescriptorProto {
    ServiceDescriptorProto {
        name: Some(name.to_string()),
        method: methods
            .iter()
            .map(|(name, input, output)| MethodDescriptorProto {
                name: Some(name.to_string()),
                input_type: Some(input.to_string()),
                output_type: Some(output.to_string()),
                ..Default::default()
            })
            .collect(),
        ..Default::default()
    }
}

pub fn pool(fd_set: FileDescriptorSet) -> DescriptorPool {
    DescriptorPool::from_file_descriptor_set(fd_set).expect("Failed to build descriptor pool")
}

/// One `Orders` service with a single `Create(CreateRequest) returns (Order)` method.
///
/// * `orders.proto` declares the service.
/// * `orders_types.proto` declares `CreateRequest` and `Order`.
/// * `common.proto` declares the `Status` enum used by `Order`.
pub fn orders(package: &str) -> FileDescriptorSet {
    let common = file(
        "common.proto",
        package,
        &[],
        vec![],
        vec![enumeration(
            "Status",
            &["STATUS_UNSPECIFIED", "STATUS_OPEN", "STATUS_SHIPPED"],
        )],
        vec![],
    );

    let types = file(
        "orders_types.proto",
        package,
        &["common.proto"],
        vec![
            message(
                "CreateRequest",
                vec![
                    scalar("customer_id", 1, Type::String),
                    repeated(scalar("sku", 2, Type::String)),
                ],
            ),
            message(
                "Order",
                vec![
                    scalar("id", 1, Type::String),
                    enum_field("status", 2, &qualify(package, "Status")),
                ],
            ),
        ],
        vec![],
        vec![],
    );

    let orders = file(
        "orders.proto",
        package,
        &["orders_types.proto"],
        vec![],
        vec![],
        vec![service(
            "Orders",
            &[(
                "Create",
                &qualify(package, "CreateRequest"),
                &qualify(package, "Order"),
            )],
        )],
    );

    FileDescriptorSet {
        file: vec![common, types, orders],
    }
}

/// Two services sharing types, with recursive messages, maps and an unused import.
///
/// * `shared.proto` (`shared`): `Money` and its `Currency` enum, used by both services.
/// * `tree.proto` (`tree`): `Node` references itself and `Leaf`, which references `Node` back.
/// * `labels.proto` (`labels`): `Label` enum, only reachable as a map value.
/// * `unused.proto` (`unused`): imported by `inventory.proto` but never referenced.
/// * `inventory.proto` (`inventory`): `Inventory` service, `Item` with two map fields, `Snapshot`.
/// * `pricing.proto` (`pricing`): `Pricing` service using `shared.Money`.
pub fn catalog() -> FileDescriptorSet {
    let shared = file(
        "shared.proto",
        "shared",
        &[],
        vec![message(
            "Money",
            vec![
                scalar("units", 1, Type::Int64),
                enum_field("currency", 2, ".shared.Currency"),
            ],
        )],
        vec![enumeration("Currency", &["CURRENCY_UNSPECIFIED", "EUR", "USD"])],
        vec![],
    );

    let tree = file(
        "tree.proto",
        "tree",
        &[],
        vec![
            message(
                "Node",
                vec![
                    scalar("label", 1, Type::String),
                    repeated(message_field("children", 2, ".tree.Node")),
                    message_field("parent", 3, ".tree.Node"),
                    message_field("leaf", 4, ".tree.Leaf"),
                ],
            ),
            message("Leaf", vec![message_field("owner", 1, ".tree.Node")]),
        ],
        vec![],
        vec![],
    );

    let labels = file(
        "labels.proto",
        "labels",
        &[],
        vec![],
        vec![enumeration("Label", &["LABEL_UNSPECIFIED", "FRAGILE", "COLD"])],
        vec![],
    );

    let unused = file(
        "unused.proto",
        "unused",
        &[],
        vec![message("Orphan", vec![scalar("id", 1, Type::String)])],
        vec![],
        vec![],
    );

    let mut item = message("Item", vec![scalar("sku", 1, Type::String)]);
    add_map_field(
        &mut item,
        ".inventory.Item",
        "prices",
        2,
        scalar("", 0, Type::String),
        message_field("", 0, ".shared.Money"),
    );
    add_map_field(
        &mut item,
        ".inventory.Item",
        "labels",
        3,
        scalar("", 0, Type::Int32),
        enum_field("", 0, ".labels.Label"),
    );

    let inventory = file(
        "inventory.proto",
        "inventory",
        &["shared.proto", "tree.proto", "labels.proto", "unused.proto"],
        vec![
            item,
            message("Snapshot", vec![message_field("root", 1, ".tree.Node")]),
        ],
        vec![],
        vec![service(
            "Inventory",
            &[
                ("Get", ".inventory.Item", ".inventory.Item"),
                ("Browse", ".inventory.Snapshot", ".inventory.Snapshot"),
            ],
        )],
    );

    let pricing = file(
        "pricing.proto",
        "pricing",
        &["shared.proto"],
        vec![message("Quote", vec![message_field("total", 1, ".shared.Money")])],
        vec![],
        vec![service(
            "Pricing",
            &[("Quote", ".pricing.Quote", ".pricing.Quote")],
        )],
    );

    FileDescriptorSet {
        file: vec![shared, tree, labels, unused, inventory, pricing],
    }
}

fn camel_case(name: &str) -> String {
    name.split('_')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect()
}
