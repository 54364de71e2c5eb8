//! Built-in component catalog loaded at registry initialization.

use std::f64::consts::TAU;

use crate::error::AppError;
use crate::model::ParamType::{Boolean, Curve, Geometry, Number, Plane, Point, Solid, Text, Vector};
use crate::model::{ComponentBuilder, ComponentDefinition, ParamValue, Parameter};

/// Every built-in definition, in registration order.
pub fn builtin_components() -> Result<Vec<ComponentDefinition>, AppError> {
    let mut out = Vec::new();
    out.extend(primitive_components()?);
    out.extend(curve_components()?);
    out.extend(surface_components()?);
    out.extend(transform_components()?);
    out.extend(math_components()?);
    Ok(out)
}

fn base_plane() -> Parameter {
    Parameter::optional("Plane", "P", Plane, "Base plane").with_default(ParamValue::named("XY plane"))
}

fn primitive_components() -> Result<Vec<ComponentDefinition>, AppError> {
    Ok(vec![
        ComponentDefinition::builder("Point", "GH_Point")
            .category("Params", "Geometry")
            .description("Create a point from X, Y, Z coordinates")
            .input(Parameter::required("X", "X", Number, "X coordinate"))
            .input(Parameter::required("Y", "Y", Number, "Y coordinate"))
            .input(Parameter::required("Z", "Z", Number, "Z coordinate"))
            .output(Parameter::output("Point", "P", Point, "Resulting point"))
            .example("Create a point at origin (0,0,0)")
            .example("Create a point at coordinates (10, 5, 2)")
            .build()?,
        ComponentDefinition::builder("Vector", "GH_Vector")
            .category("Vector", "Vector")
            .description("Create a vector from X, Y, Z components")
            .input(Parameter::required("X", "X", Number, "X component"))
            .input(Parameter::required("Y", "Y", Number, "Y component"))
            .input(Parameter::required("Z", "Z", Number, "Z component"))
            .output(Parameter::output("Vector", "V", Vector, "Resulting vector"))
            .build()?,
        ComponentDefinition::builder("Plane", "GH_Plane")
            .category("Vector", "Plane")
            .description("Create a plane from origin and normal vector")
            .input(Parameter::required("Origin", "O", Point, "Plane origin"))
            .input(
                Parameter::optional("Normal", "N", Vector, "Plane normal")
                    .with_default(ParamValue::named("Z-axis")),
            )
            .output(Parameter::output("Plane", "P", Plane, "Resulting plane"))
            .build()?,
    ])
}

fn curve_components() -> Result<Vec<ComponentDefinition>, AppError> {
    Ok(vec![
        ComponentDefinition::builder("Circle", "GH_Circle")
            .category("Curve", "Primitive")
            .description("Create a circle from radius and plane")
            .input(base_plane())
            .input(Parameter::required("Radius", "R", Number, "Circle radius").with_min(0.0))
            .output(Parameter::output("Circle", "C", Curve, "Resulting circle"))
            .example("Create a circle with radius 10")
            .example("Create a circle on XY plane with radius 5")
            .build()?,
        ComponentDefinition::builder("Line", "GH_Line")
            .category("Curve", "Primitive")
            .description("Create a line between two points")
            .input(Parameter::required("Start", "A", Point, "Start point"))
            .input(Parameter::required("End", "B", Point, "End point"))
            .output(Parameter::output("Line", "L", Curve, "Resulting line"))
            .example("Create a line from origin to point (10,0,0)")
            .example("Connect two points with a line")
            .build()?,
        ComponentDefinition::builder("Rectangle", "GH_Rectangle")
            .category("Curve", "Primitive")
            .description("Create a rectangle from plane and dimensions")
            .input(base_plane())
            .input(Parameter::required("X Size", "X", Number, "Size in X direction").with_min(0.0))
            .input(Parameter::required("Y Size", "Y", Number, "Size in Y direction").with_min(0.0))
            .output(Parameter::output("Rectangle", "R", Curve, "Resulting rectangle"))
            .build()?,
        ComponentDefinition::builder("Polyline", "GH_Polyline")
            .category("Curve", "Spline")
            .description("Create a polyline through a series of points")
            .input(Parameter::required("Vertices", "V", Point, "Polyline vertices"))
            .input(
                Parameter::optional("Closed", "C", Boolean, "Close polyline")
                    .with_default(ParamValue::Boolean(false)),
            )
            .output(Parameter::output("Polyline", "Pl", Curve, "Resulting polyline"))
            .build()?,
    ])
}

fn surface_components() -> Result<Vec<ComponentDefinition>, AppError> {
    Ok(vec![
        ComponentDefinition::builder("Extrude", "GH_Extrude")
            .category("Surface", "Freeform")
            .description("Extrude a curve or surface along a vector")
            .input(Parameter::required("Base", "B", Geometry, "Base geometry to extrude"))
            .input(Parameter::required("Direction", "D", Vector, "Extrusion direction"))
            .output(Parameter::output("Extrusion", "E", Solid, "Extruded geometry"))
            .example("Extrude a circle to create a cylinder")
            .example("Extrude a rectangle upward by 10 units")
            .build()?,
        ComponentDefinition::builder("Loft", "GH_Loft")
            .category("Surface", "Freeform")
            .description("Create a lofted surface through curves")
            .input(Parameter::required("Curves", "C", Curve, "Curves to loft through"))
            .input(
                Parameter::optional("Closed", "Cl", Boolean, "Close loft")
                    .with_default(ParamValue::Boolean(false)),
            )
            .output(Parameter::output("Loft", "L", Solid, "Lofted surface"))
            .build()?,
        ComponentDefinition::builder("Revolve", "GH_Revolve")
            .category("Surface", "Freeform")
            .description("Revolve a curve around an axis")
            .input(Parameter::required("Curve", "C", Curve, "Curve to revolve"))
            .input(Parameter::required("Axis", "A", Vector, "Axis of revolution"))
            .input(
                Parameter::optional("Angle", "An", Number, "Revolution angle in radians")
                    .with_default(ParamValue::Number(TAU)),
            )
            .output(Parameter::output("Revolution", "R", Solid, "Revolved surface"))
            .build()?,
    ])
}

fn transform_outputs(builder: ComponentBuilder, verb: &str) -> ComponentBuilder {
    builder
        .output(Parameter::output("Geometry", "G", Geometry, &format!("{verb} geometry")))
        .output(Parameter::output("Transform", "X", Text, "Transformation data"))
}

fn transform_components() -> Result<Vec<ComponentDefinition>, AppError> {
    let center = |description: &str| {
        Parameter::optional("Center", "C", Point, description).with_default(ParamValue::named("Origin"))
    };

    Ok(vec![
        transform_outputs(
            ComponentDefinition::builder("Move", "GH_Move")
                .category("Transform", "Euclidean")
                .description("Translate geometry along a vector")
                .input(Parameter::required("Geometry", "G", Geometry, "Geometry to move"))
                .input(Parameter::required("Motion", "T", Vector, "Translation vector")),
            "Translated",
        )
        .build()?,
        transform_outputs(
            ComponentDefinition::builder("Rotate", "GH_Rotate")
                .category("Transform", "Euclidean")
                .description("Rotate geometry around an axis")
                .input(Parameter::required("Geometry", "G", Geometry, "Geometry to rotate"))
                .input(Parameter::required("Angle", "A", Number, "Rotation angle in radians"))
                .input(
                    Parameter::optional("Axis", "Ax", Vector, "Rotation axis")
                        .with_default(ParamValue::named("Z-axis")),
                )
                .input(center("Center of rotation")),
            "Rotated",
        )
        .build()?,
        transform_outputs(
            ComponentDefinition::builder("Scale", "GH_Scale")
                .category("Transform", "Euclidean")
                .description("Scale geometry uniformly or non-uniformly")
                .input(Parameter::required("Geometry", "G", Geometry, "Geometry to scale"))
                .input(Parameter::required("Factor", "F", Number, "Scale factor"))
                .input(center("Center of scaling")),
            "Scaled",
        )
        .build()?,
    ])
}

fn math_components() -> Result<Vec<ComponentDefinition>, AppError> {
    Ok(vec![
        ComponentDefinition::builder("Addition", "GH_Addition")
            .category("Math", "Operators")
            .description("Add two numbers")
            .input(Parameter::required("A", "A", Number, "First number"))
            .input(Parameter::required("B", "B", Number, "Second number"))
            .output(Parameter::output("Result", "R", Number, "Sum of A and B"))
            .build()?,
        ComponentDefinition::builder("Multiplication", "GH_Multiplication")
            .category("Math", "Operators")
            .description("Multiply two numbers")
            .input(Parameter::required("A", "A", Number, "First number"))
            .input(Parameter::required("B", "B", Number, "Second number"))
            .output(Parameter::output("Result", "R", Number, "Product of A and B"))
            .build()?,
        ComponentDefinition::builder("Number Slider", "GH_NumberSlider")
            .category("Params", "Input")
            .description("A slider for numeric input")
            .output(Parameter::output("Number", "N", Number, "Slider value"))
            .build()?,
    ])
}
