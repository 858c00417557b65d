use matc_ast::ElemType;

/// The scalar C++ type standing in for one element-type tag. Matrix- and
/// cell-typed nodes wrap this in the runtime's container templates
/// (`cpp_type_for`); this is only ever the element type.
pub fn scalar_cpp_type(ty: ElemType) -> &'static str {
    match ty {
        ElemType::Boolean => "bool",
        ElemType::Char => "char",
        ElemType::Integer => "std::int64_t",
        ElemType::Real => "double",
        ElemType::String => "std::string",
        ElemType::Cell => "matc::Cell",
        ElemType::Function => "matc::FunctionHandle",
        ElemType::Dynamic => "matc::DynamicValue",
        ElemType::NotApplicable => "void",
    }
}

/// The full C++ type for a node carrying both a `data_type` and a shape:
/// a 1x1 shape is a bare scalar, anything else is a `matc::Matrix<T>` of
/// the scalar element type (spec.md §4.7's target-language typing is
/// derived directly from the shape/type annotations the analysis passes
/// filled in — the emitter never re-derives either).
pub fn cpp_type_for(ty: Option<ElemType>, rows: Option<u32>, cols: Option<u32>) -> String {
    let ty = ty.unwrap_or(ElemType::Dynamic);
    let base = scalar_cpp_type(ty);
    match ty {
        ElemType::Cell | ElemType::Function | ElemType::Dynamic | ElemType::String | ElemType::NotApplicable => {
            base.to_string()
        }
        _ => match (rows, cols) {
            (Some(r), Some(c)) if (r, c) != (1, 1) => format!("matc::Matrix<{base}>"),
            _ => base.to_string(),
        },
    }
}
