pub mod product_dto;

pub use product_dto::{
    CreateProductDto, ProductListQuery, ProductResponseDto, ReorderProductItemDto,
    RestoreProductItemDto, UpdateProductDto,
};
