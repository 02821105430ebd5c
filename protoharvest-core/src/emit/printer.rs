//! # Proto Printer
//!
//! Renders a resolved [`FileDescriptor`] back into `.proto` source that `protoc` can compile.
//!
//! The output is canonical rather than a copy of the original source: comments and formatting
//! are lost, declarations are grouped by kind, and every type reference is printed fully
//! qualified (e.g. `.orders.v1.Order`) so no scope resolution is needed when reading it back.
//! Map fields are printed as `map<K, V>` and their synthetic entry messages are hidden. Proto2
//! groups are printed inline as `group Name = N { ... }`.
//!
//! Only `proto2` and `proto3` files can be printed. Editions files carry their semantics in
//! feature options that reflection does not round-trip, so they are rejected with
//! [`UnsupportedSyntax`].
//!
//! Only options that have a dedicated field in `descriptor.proto` are printed. Custom options
//! (extensions such as `google.api.http`) are not carried by the reflected descriptors.
use prost_reflect::FileDescriptor;
use prost_types::{
    DescriptorProto, EnumDescriptorProto, FieldDescriptorProto, FileDescriptorProto,
    ServiceDescriptorProto,
    descriptor_proto::ReservedRange,
    enum_descriptor_proto::EnumReservedRange,
    field_descriptor_proto::{Label, Type},
};
use std::collections::HashSet;

/// The file declares a syntax other than `proto2` or `proto3` (e.g. `editions`).
#[derive(Debug, thiserror::Error)]
#[error("Cannot print '{file}': syntax '{syntax}' is not supported, only proto2 and proto3 are")]
pub struct UnsupportedSyntax {
    pub file: String,
    pub syntax: String,
}

const INDENT: &str = "  ";

/// Largest field number allowed by protobuf, printed as `max` in ranges.
const MAX_FIELD_NUMBER: i32 = 536_870_911;

/// Renders `file` as `.proto` source.
pub fn print_file(file: &FileDescriptor) -> Result<String, UnsupportedSyntax> {
    print_file_proto(file.file_descriptor_proto())
}

/// Renders a raw `FileDescriptorProto` as `.proto` source.
pub fn print_file_proto(file: &FileDescriptorProto) -> Result<String, UnsupportedSyntax> {
    // An absent syntax means proto2.
    let proto3 = match file.syntax() {
        "" | "proto2" => false,
        "proto3" => true,
        other => {
            return Err(UnsupportedSyntax {
                file: file.name().to_string(),
                syntax: other.to_string(),
            });
        }
    };

    let mut printer = Printer {
        out: String::new(),
        depth: 0,
        proto3,
    };

    printer.file(file);
    Ok(printer.out)
}

struct Printer {
    out: String,
    depth: usize,
    proto3: bool,
}

impl Printer {
    fn line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.out.push_str(INDENT);
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn blank(&mut self) {
        self.out.push('\n');
    }

    fn open(&mut self, header: &str) {
        self.line(&format!("{header} {{"));
        self.depth += 1;
    }

    fn close(&mut self) {
        self.depth -= 1;
        self.line("}");
    }

    fn file(&mut self, file: &FileDescriptorProto) {
        let syntax = if self.proto3 { "proto3" } else { "proto2" };
        self.line(&format!("syntax = \"{syntax}\";"));

        if !file.package().is_empty() {
            self.blank();
            self.line(&format!("package {};", file.package()));
        }

        if !file.dependency.is_empty() {
            self.blank();
            for (index, dependency) in file.dependency.iter().enumerate() {
                let index = index as i32;
                let modifier = if file.public_dependency.contains(&index) {
                    "public "
                } else if file.weak_dependency.contains(&index) {
                    "weak "
                } else {
                    ""
                };
                self.line(&format!("import {modifier}\"{}\";", escape(dependency)));
            }
        }

        let options = file_options(file);
        if !options.is_empty() {
            self.blank();
            for option in options {
                self.line(&format!("option {option};"));
            }
        }

        let scope = if file.package().is_empty() {
            String::new()
        } else {
            format!(".{}", file.package())
        };

        let groups = group_types(&file.extension);

        for message in &file.message_type {
            if groups.contains(&format!("{scope}.{}", message.name())) {
                continue;
            }
            self.blank();
            self.message(message, &scope);
        }

        for enum_desc in &file.enum_type {
            self.blank();
            self.enumeration(enum_desc);
        }

        if !file.extension.is_empty() {
            self.blank();
            self.extensions(&file.extension, &file.message_type, &scope);
        }

        for service in &file.service {
            self.blank();
            self.service(service);
        }
    }

    fn message(&mut self, message: &DescriptorProto, parent_scope: &str) {
        self.open(&format!("message {}", message.name()));
        self.message_body(message, parent_scope);
        self.close();
    }

    fn message_body(&mut self, message: &DescriptorProto, parent_scope: &str) {
        let scope = format!("{parent_scope}.{}", message.name());

        if message.options.as_ref().and_then(|o| o.deprecated) == Some(true) {
            self.line("option deprecated = true;");
        }

        let mut printed_oneofs = HashSet::new();

        for field in &message.field {
            match real_oneof_index(field) {
                Some(index) => {
                    if printed_oneofs.insert(index) {
                        self.oneof(message, index, &scope);
                    }
                }
                None => self.member(field, message, &scope, false),
            }
        }

        for enum_desc in &message.enum_type {
            self.enumeration(enum_desc);
        }

        let groups = group_types(message.field.iter().chain(&message.extension));

        for nested in &message.nested_type {
            let nested_name = format!("{scope}.{}", nested.name());
            if !is_map_entry(nested) && !groups.contains(&nested_name) {
                self.message(nested, &scope);
            }
        }

        if !message.extension.is_empty() {
            self.extensions(&message.extension, &message.nested_type, &scope);
        }

        if !message.extension_range.is_empty() {
            let ranges: Vec<_> = message
                .extension_range
                .iter()
                .map(|r| format_range(r.start(), r.end() - 1))
                .collect();
            self.line(&format!("extensions {};", ranges.join(", ")));
        }

        self.reserved(
            message.reserved_range.iter().map(message_reserved_range),
            &message.reserved_name,
        );
    }

    /// Prints a field of `message`, expanding groups into their inline body.
    fn member(
        &mut self,
        field: &FieldDescriptorProto,
        message: &DescriptorProto,
        scope: &str,
        in_oneof: bool,
    ) {
        match group_of(field, &message.nested_type, scope) {
            Some(group) => self.group(field, group, scope, in_oneof),
            None => {
                let text = self.field(field, message, scope, in_oneof);
                self.line(&text);
            }
        }
    }

    fn group(
        &mut self,
        field: &FieldDescriptorProto,
        group: &DescriptorProto,
        scope: &str,
        in_oneof: bool,
    ) {
        self.open(&format!(
            "{}group {} = {}{}",
            self.label(field, in_oneof),
            group.name(),
            field.number(),
            self.field_options(field)
        ));
        self.message_body(group, scope);
        self.close();
    }

    fn oneof(&mut self, message: &DescriptorProto, index: i32, scope: &str) {
        let name = message
            .oneof_decl
            .get(index as usize)
            .map(|o| o.name().to_string())
            .unwrap_or_else(|| format!("oneof_{index}"));

        self.open(&format!("oneof {name}"));

        for field in message
            .field
            .iter()
            .filter(|f| real_oneof_index(f) == Some(index))
        {
            self.member(field, message, scope, true);
        }

        self.close();
    }

    fn field(
        &self,
        field: &FieldDescriptorProto,
        message: &DescriptorProto,
        scope: &str,
        in_oneof: bool,
    ) -> String {
        let type_name = match map_entry_of(field, message, scope) {
            Some(entry) => {
                let key = entry.field.iter().find(|f| f.number() == 1);
                let value = entry.field.iter().find(|f| f.number() == 2);
                format!(
                    "map<{}, {}>",
                    key.map(field_type).unwrap_or_default(),
                    value.map(field_type).unwrap_or_default()
                )
            }
            None => format!("{}{}", self.label(field, in_oneof), field_type(field)),
        };

        format!(
            "{} {} = {}{};",
            type_name,
            field.name(),
            field.number(),
            self.field_options(field)
        )
    }

    fn label(&self, field: &FieldDescriptorProto, in_oneof: bool) -> &'static str {
        if in_oneof {
            return "";
        }

        if field.proto3_optional() {
            return "optional ";
        }

        match field.label() {
            Label::Repeated => "repeated ",
            Label::Required => "required ",
            Label::Optional if self.proto3 => "",
            Label::Optional => "optional ",
        }
    }

    fn field_options(&self, field: &FieldDescriptorProto) -> String {
        let mut options = Vec::new();

        if let Some(default) = &field.default_value {
            let value = match field.r#type() {
                Type::String => format!("\"{}\"", escape(default)),
                // Bytes defaults are stored already escaped.
                Type::Bytes => format!("\"{default}\""),
                _ => default.clone(),
            };
            options.push(format!("default = {value}"));
        }

        if let Some(json_name) = &field.json_name
            && *json_name != default_json_name(field.name())
        {
            options.push(format!("json_name = \"{}\"", escape(json_name)));
        }

        if let Some(field_options) = &field.options {
            if let Some(packed) = field_options.packed {
                options.push(format!("packed = {packed}"));
            }
            if field_options.deprecated == Some(true) {
                options.push("deprecated = true".to_string());
            }
        }

        if options.is_empty() {
            String::new()
        } else {
            format!(" [{}]", options.join(", "))
        }
    }

    fn enumeration(&mut self, enum_desc: &EnumDescriptorProto) {
        self.open(&format!("enum {}", enum_desc.name()));

        if let Some(options) = &enum_desc.options {
            if options.allow_alias == Some(true) {
                self.line("option allow_alias = true;");
            }
            if options.deprecated == Some(true) {
                self.line("option deprecated = true;");
            }
        }

        for value in &enum_desc.value {
            let deprecated = value.options.as_ref().and_then(|o| o.deprecated) == Some(true);
            let suffix = if deprecated { " [deprecated = true]" } else { "" };
            self.line(&format!("{} = {}{};", value.name(), value.number(), suffix));
        }

        self.reserved(
            enum_desc.reserved_range.iter().map(enum_reserved_range),
            &enum_desc.reserved_name,
        );

        self.close();
    }

    /// Prints `extend` blocks. Group extensions find their body among `siblings`, the messages
    /// declared in the same `scope`.
    fn extensions(
        &mut self,
        extensions: &[FieldDescriptorProto],
        siblings: &[DescriptorProto],
        scope: &str,
    ) {
        let mut extendees: Vec<&str> = Vec::new();
        for extension in extensions {
            if !extendees.contains(&extension.extendee()) {
                extendees.push(extension.extendee());
            }
        }

        for extendee in extendees {
            self.open(&format!("extend {extendee}"));
            for extension in extensions.iter().filter(|e| e.extendee() == extendee) {
                if let Some(group) = group_of(extension, siblings, scope) {
                    self.group(extension, group, scope, false);
                    continue;
                }

                let text = format!(
                    "{}{} {} = {}{};",
                    self.label(extension, false),
                    field_type(extension),
                    extension.name(),
                    extension.number(),
                    self.field_options(extension)
                );
                self.line(&text);
            }
            self.close();
        }
    }

    fn service(&mut self, service: &ServiceDescriptorProto) {
        self.open(&format!("service {}", service.name()));

        if service.options.as_ref().and_then(|o| o.deprecated) == Some(true) {
            self.line("option deprecated = true;");
        }

        for method in &service.method {
            let input_stream = if method.client_streaming() { "stream " } else { "" };
            let output_stream = if method.server_streaming() { "stream " } else { "" };

            let signature = format!(
                "rpc {}({}{}) returns ({}{})",
                method.name(),
                input_stream,
                method.input_type(),
                output_stream,
                method.output_type()
            );

            if method.options.as_ref().and_then(|o| o.deprecated) == Some(true) {
                self.open(&signature);
                self.line("option deprecated = true;");
                self.close();
            } else {
                self.line(&format!("{signature};"));
            }
        }

        self.close();
    }

    fn reserved(&mut self, ranges: impl Iterator<Item = String>, names: &[String]) {
        let ranges: Vec<_> = ranges.collect();
        if !ranges.is_empty() {
            self.line(&format!("reserved {};", ranges.join(", ")));
        }

        if !names.is_empty() {
            let names: Vec<_> = names.iter().map(|n| format!("\"{}\"", escape(n))).collect();
            self.line(&format!("reserved {};", names.join(", ")));
        }
    }
}

fn file_options(file: &FileDescriptorProto) -> Vec<String> {
    let Some(options) = &file.options else {
        return vec![];
    };

    let strings = [
        ("java_package", &options.java_package),
        ("java_outer_classname", &options.java_outer_classname),
        ("go_package", &options.go_package),
        ("objc_class_prefix", &options.objc_class_prefix),
        ("csharp_namespace", &options.csharp_namespace),
        ("swift_prefix", &options.swift_prefix),
        ("php_namespace", &options.php_namespace),
        ("ruby_package", &options.ruby_package),
    ];

    let mut out: Vec<_> = strings
        .into_iter()
        .filter_map(|(name, value)| {
            value
                .as_ref()
                .map(|value| format!("{name} = \"{}\"", escape(value)))
        })
        .collect();

    let bools = [
        ("java_multiple_files", options.java_multiple_files),
        ("cc_enable_arenas", options.cc_enable_arenas),
        ("deprecated", options.deprecated),
    ];

    out.extend(
        bools
            .into_iter()
            .filter_map(|(name, value)| value.map(|value| format!("{name} = {value}"))),
    );

    out
}

fn field_type(field: &FieldDescriptorProto) -> String {
    let scalar = match field.r#type() {
        Type::Double => "double",
        Type::Float => "float",
        Type::Int64 => "int64",
        Type::Uint64 => "uint64",
        Type::Int32 => "int32",
        Type::Fixed64 => "fixed64",
        Type::Fixed32 => "fixed32",
        Type::Bool => "bool",
        Type::String => "string",
        Type::Bytes => "bytes",
        Type::Uint32 => "uint32",
        Type::Sfixed32 => "sfixed32",
        Type::Sfixed64 => "sfixed64",
        Type::Sint32 => "sint32",
        Type::Sint64 => "sint64",
        Type::Message | Type::Enum | Type::Group => return field.type_name().to_string(),
    };

    scalar.to_string()
}

/// Index of the oneof `field` belongs to, ignoring the synthetic oneofs of proto3 `optional`.
fn real_oneof_index(field: &FieldDescriptorProto) -> Option<i32> {
    if field.proto3_optional() {
        None
    } else {
        field.oneof_index
    }
}

/// Fully qualified names of the messages backing the group-typed fields among `fields`.
fn group_types<'a>(fields: impl IntoIterator<Item = &'a FieldDescriptorProto>) -> HashSet<String> {
    fields
        .into_iter()
        .filter(|field| field.r#type() == Type::Group)
        .map(|field| field.type_name().to_string())
        .collect()
}

fn group_of<'a>(
    field: &FieldDescriptorProto,
    siblings: &'a [DescriptorProto],
    scope: &str,
) -> Option<&'a DescriptorProto> {
    if field.r#type() != Type::Group {
        return None;
    }

    siblings
        .iter()
        .find(|nested| field.type_name() == format!("{scope}.{}", nested.name()))
}

fn is_map_entry(message: &DescriptorProto) -> bool {
    message.options.as_ref().and_then(|o| o.map_entry) == Some(true)
}

fn map_entry_of<'a>(
    field: &FieldDescriptorProto,
    message: &'a DescriptorProto,
    scope: &str,
) -> Option<&'a DescriptorProto> {
    if field.label() != Label::Repeated || field.r#type() != Type::Message {
        return None;
    }

    message
        .nested_type
        .iter()
        .filter(|nested| is_map_entry(nested))
        .find(|nested| field.type_name() == format!("{scope}.{}", nested.name()))
}

fn message_reserved_range(range: &ReservedRange) -> String {
    // Message ranges are end-exclusive.
    format_range(range.start(), range.end() - 1)
}

fn enum_reserved_range(range: &EnumReservedRange) -> String {
    let end = if range.end() == i32::MAX {
        MAX_FIELD_NUMBER
    } else {
        range.end()
    };
    format_range(range.start(), end)
}

fn format_range(start: i32, end: i32) -> String {
    if end >= MAX_FIELD_NUMBER {
        format!("{start} to max")
    } else if start == end {
        start.to_string()
    } else {
        format!("{start} to {end}")
    }
}

/// The JSON name `protoc` derives for a field when none is given explicitly.
fn default_json_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut capitalize = false;

    for c in name.chars() {
        if c == '_' {
            capitalize = true;
        } else if capitalize {
            out.extend(c.to_uppercase());
            capitalize = false;
        } else {
            out.push(c);
        }
    }

    out
}

fn escape(value: &str) -> String {
    value.chars().fold(String::with_capacity(value.len()), |mut acc, c| {
        match c {
            '\\' => acc.push_str("\\\\"),
            '"' => acc.push_str("\\\""),
            '\n' => acc.push_str("\\n"),
            '\r' => acc.push_str("\\r"),
            '\t' => acc.push_str("\\t"),
            c if c.is_ascii_control() => acc.push_str(&format!("\\x{:02x}", c as u32)),
            c => acc.push(c),
        }
        acc
    })
}
